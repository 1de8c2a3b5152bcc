use std::collections::VecDeque;

/// One cell of a context window.
///
/// A window starts out filled with `Empty` placeholders before any word of a
/// corpus unit has been read; `Empty` is a distinguished sentinel rather than
/// a literal empty string token, so a placeholder can never be confused with
/// word content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
	Empty,
	Word(String),
}

impl Slot {
	/// Renders the slot for use inside a mapping key (`Empty` renders empty).
	pub fn as_str(&self) -> &str {
		match self {
			Slot::Empty => "",
			Slot::Word(word) => word,
		}
	}
}

/// A fixed-length ordered window of consecutive words, used as a lookup key
/// into the chain's mappings.
///
/// Conceptually this is the Markov context: the last `len` words seen while
/// scanning a corpus unit left to right (or, during backward generation, the
/// next `len` words when walking right to left).
///
/// # Responsibilities
/// - Slide forward over a corpus unit (`shift`)
/// - Slide backward from an anchor during bidirectional generation (`left_shift`)
/// - Render itself as a mapping key (`key`) and rebuild from one (`from_key`)
///
/// # Invariants
/// - The window always contains exactly `len` slots; shifting in one word
///   always evicts exactly one slot at the opposite end.
/// - Both shift operations are pure: they return the evicted slot together
///   with the shifted window and never mutate the receiver, so an anchor
///   window can be reused independently by the forward and backward passes.
///
/// # Notes
/// Keys join the rendered slots with single spaces. Tokenization splits on
/// whitespace, so a token can never contain the separator; if tokens were
/// ever produced another way, two distinct windows could render to the same
/// key. This is a known limitation of the key format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefix {
	slots: VecDeque<Slot>,
}

impl Prefix {
	/// Creates a window of `len` placeholder slots (the pre-start context).
	pub fn new(len: usize) -> Self {
		Self { slots: vec![Slot::Empty; len].into() }
	}

	/// Rebuilds a window from a mapping key previously produced by `key()`.
	///
	/// Empty segments become placeholder slots. The key must contain exactly
	/// `len` space-separated segments; keys taken from a chain built with the
	/// same `len` always do.
	pub fn from_key(key: &str, len: usize) -> Self {
		let mut slots: VecDeque<Slot> = key
			.split(' ')
			.map(|part| {
				if part.is_empty() { Slot::Empty } else { Slot::Word(part.to_owned()) }
			})
			.collect();
		// Kept for safety, see above: keys from a chain are always well-formed
		slots.resize(len, Slot::Empty);
		Self { slots }
	}

	/// Renders the window as a mapping key: slots joined with single spaces.
	pub fn key(&self) -> String {
		self.slots
			.iter()
			.map(Slot::as_str)
			.collect::<Vec<_>>()
			.join(" ")
	}

	/// Slides the window forward by one word.
	///
	/// # Returns
	/// The evicted (oldest) slot and the new window with `word` appended at
	/// the newest end. The receiver is left untouched.
	pub fn shift(&self, word: &str) -> (Slot, Prefix) {
		let mut slots = self.slots.clone();
		// len >= 1, pop cannot fail
		let evicted = slots.pop_front().unwrap_or(Slot::Empty);
		slots.push_back(Slot::Word(word.to_owned()));
		(evicted, Self { slots })
	}

	/// Slides the window backward by one slot (the mirror of `shift`).
	///
	/// # Returns
	/// The evicted (newest) slot and the new window with `slot` prepended at
	/// the oldest end. Used only when extending text backward from an anchor.
	pub fn left_shift(&self, slot: Slot) -> (Slot, Prefix) {
		let mut slots = self.slots.clone();
		let evicted = slots.pop_back().unwrap_or(Slot::Empty);
		slots.push_front(slot);
		(evicted, Self { slots })
	}

	/// Iterates over the words currently in the window, skipping placeholders.
	pub fn words(&self) -> impl Iterator<Item = &str> {
		self.slots.iter().filter_map(|slot| match slot {
			Slot::Empty => None,
			Slot::Word(word) => Some(word.as_str()),
		})
	}
}
