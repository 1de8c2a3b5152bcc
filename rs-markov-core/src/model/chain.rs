use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use rand::Rng;

use super::prefix::{Prefix, Slot};
use crate::io::read_file;

/// Corpus units with fewer words than this carry no usable context and are
/// skipped during bulk ingestion.
const MIN_UNIT_WORDS: usize = 3;

/// A word-level Markov chain with forward and backward context mappings.
///
/// The `Chain` learns, from whitespace-tokenized corpus units, which words
/// follow and which words precede each fixed-length context window, and
/// generates text by uniform random sampling over the stored candidates.
/// Candidate lists keep duplicates, so sampling is weighted by empirical
/// frequency.
///
/// # Responsibilities
/// - Accumulate forward and backward transitions from corpus units (`build`)
/// - Generate text forward from a cold start (`generate`)
/// - Generate text in both directions around a keyword anchor
///   (`generate_with_keyword`)
/// - Merge with another chain of the same context length (parallel ingestion)
///
/// # Invariants
/// - `prefix_len` is always >= 1 and immutable after construction
/// - Every mapping key renders a window of exactly `prefix_len` slots
/// - Candidate lists are append-only during `build`/`merge`; generation
///   never mutates them
///
/// # Notes
/// Absence of data is never an error here: a context without candidates is a
/// normal stop condition and a chain with no data generates the empty
/// string. Both generation modes are safe to call on a cold or partially
/// built chain.
#[derive(Clone, Debug)]
pub struct Chain {
	/// Context key -> words observed to follow that context.
	forward: HashMap<String, Vec<String>>,
	/// Context key -> slots observed to precede that context. Placeholder
	/// slots are recorded near the start of a unit.
	backward: HashMap<String, Vec<Slot>>,
	/// Context window length in words.
	prefix_len: usize,
}

impl Chain {
	/// Creates an empty chain with context windows of `prefix_len` words.
	///
	/// # Errors
	/// Returns an error if `prefix_len < 1`.
	pub fn new(prefix_len: usize) -> Result<Self, String> {
		if prefix_len < 1 {
			return Err("prefix_len must be >= 1".to_owned());
		}
		Ok(Self { forward: HashMap::new(), backward: HashMap::new(), prefix_len })
	}

	/// Returns the fixed context window length.
	pub fn prefix_len(&self) -> usize {
		self.prefix_len
	}

	/// Returns the number of distinct forward contexts learned so far.
	pub fn context_count(&self) -> usize {
		self.forward.len()
	}

	/// Returns `true` if the chain has learned nothing yet.
	pub fn is_empty(&self) -> bool {
		self.forward.is_empty()
	}

	/// Feeds one corpus unit (e.g. one message body) into the chain.
	///
	/// Tokenizes `text` on whitespace and scans it once left to right. For
	/// each word, the pre-shift context maps forward to the word and the
	/// post-shift context maps backward to the evicted slot. The window
	/// starts fresh (all placeholders) on every call: separate corpus units
	/// do not share context, though their transitions accumulate in the same
	/// mappings.
	///
	/// Never fails; an empty or whitespace-only unit is a no-op.
	pub fn build(&mut self, text: &str) {
		let mut prefix = Prefix::new(self.prefix_len);
		for word in text.split_whitespace() {
			self.forward.entry(prefix.key()).or_default().push(word.to_owned());
			let (evicted, shifted) = prefix.shift(word);
			prefix = shifted;
			self.backward.entry(prefix.key()).or_default().push(evicted);
		}
	}

	/// Generates at most `n` words starting from the pre-start context.
	///
	/// At each step a candidate is drawn uniformly at random from the words
	/// observed to follow the current context; generation stops early when a
	/// context has no recorded continuation.
	///
	/// # Returns
	/// The generated words joined with spaces; empty when the chain has no
	/// data for the initial context (e.g. a never-built chain) or `n == 0`.
	pub fn generate(&self, n: usize) -> String {
		self.generate_with_rng(&mut rand::rng(), n)
	}

	/// Generates text around a context matching `keyword`.
	///
	/// Scans the known forward contexts for one containing `keyword` as a
	/// case-insensitive substring; the last match encountered during the
	/// (unordered) map traversal wins. The matched context seeds the output,
	/// which is then extended up to `n` words forward and, independently, up
	/// to `n` words backward from the same anchor.
	///
	/// # Returns
	/// The trimmed, space-joined sequence (between `prefix_len` and
	/// `prefix_len + 2n` words when the anchor window is full), or the empty
	/// string when no context matches.
	pub fn generate_with_keyword(&self, keyword: &str, n: usize) -> String {
		self.generate_with_keyword_rng(&mut rand::rng(), keyword, n)
	}

	/// `generate` with an explicit random source.
	fn generate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> String {
		let mut prefix = Prefix::new(self.prefix_len);
		let mut words: Vec<String> = Vec::new();
		for _ in 0..n {
			let Some(next) = self.pick(rng, &self.forward, &prefix) else {
				break;
			};
			let (_, shifted) = prefix.shift(&next);
			prefix = shifted;
			words.push(next);
		}
		words.join(" ")
	}

	/// `generate_with_keyword` with an explicit random source.
	fn generate_with_keyword_rng<R: Rng + ?Sized>(&self, rng: &mut R, keyword: &str, n: usize) -> String {
		let needle = keyword.to_lowercase();
		let mut anchor_key: Option<&String> = None;
		for key in self.forward.keys() {
			if key.to_lowercase().contains(&needle) {
				// Last match over the unordered traversal wins
				anchor_key = Some(key);
			}
		}
		let Some(anchor_key) = anchor_key else {
			return String::new();
		};

		let anchor = Prefix::from_key(anchor_key, self.prefix_len);
		let mut words: VecDeque<String> = anchor.words().map(str::to_owned).collect();

		// Forward pass over a copy of the anchor window
		let mut prefix = anchor.clone();
		for _ in 0..n {
			let Some(next) = self.pick(rng, &self.forward, &prefix) else {
				break;
			};
			let (_, shifted) = prefix.shift(&next);
			prefix = shifted;
			words.push_back(next);
		}

		// Backward pass over an untouched copy of the anchor window
		let mut prefix = anchor;
		for _ in 0..n {
			let Some(choices) = self.backward.get(&prefix.key()) else {
				break;
			};
			if choices.is_empty() {
				break;
			}
			let prev = choices[rng.random_range(0..choices.len())].clone();
			if let Slot::Word(word) = &prev {
				words.push_front(word.clone());
			}
			let (_, shifted) = prefix.left_shift(prev);
			prefix = shifted;
		}

		Vec::from(words).join(" ")
	}

	/// Draws a uniformly random continuation of `prefix` from `mapping`.
	///
	/// Returns `None` when the context has no candidates, which generation
	/// treats as its normal stop condition.
	fn pick<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		mapping: &HashMap<String, Vec<String>>,
		prefix: &Prefix,
	) -> Option<String> {
		let choices = mapping.get(&prefix.key())?;
		if choices.is_empty() {
			// Entries are only created on append; kept for safety
			return None;
		}
		Some(choices[rng.random_range(0..choices.len())].clone())
	}

	/// Merges another chain into this one.
	///
	/// Candidate lists for matching contexts are concatenated, preserving
	/// duplicates (and therefore empirical frequencies).
	///
	/// This method is intended for parallel ingestion, where partial chains
	/// built on worker threads are combined into a single one.
	///
	/// # Errors
	/// Returns an error if the context lengths do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.prefix_len != other.prefix_len {
			return Err(format!(
				"Prefix length mismatch: self={}, other={}",
				self.prefix_len, other.prefix_len
			));
		}

		for (key, candidates) in &other.forward {
			self.forward.entry(key.clone()).or_default().extend(candidates.iter().cloned());
		}
		for (key, candidates) in &other.backward {
			self.backward.entry(key.clone()).or_default().extend(candidates.iter().cloned());
		}

		Ok(())
	}

	/// Builds a chain from a corpus file, one corpus unit per line.
	///
	/// # Parameters
	/// - `filepath`: Input text file.
	/// - `prefix_len`: Context window length for the new chain.
	///
	/// # Returns
	/// - `Ok(Chain)`: The fully merged chain.
	/// - `Err(...)`: If the file cannot be read, or `prefix_len < 1`.
	///
	/// # Behavior
	/// - Splits the lines into chunks (based on CPU cores * factor).
	/// - Spawns threads to build partial chains for each chunk.
	/// - Skips units shorter than three words (service noise, bare acks).
	/// - Merges all partial chains sequentially.
	///
	/// # Notes
	/// - Uses MPSC channels to collect partial chains from threads.
	pub fn from_corpus_file<P: AsRef<Path>>(filepath: P, prefix_len: usize) -> Result<Self, Box<dyn std::error::Error>> {
		let template = Self::new(prefix_len)?;
		let lines = read_file(&filepath)?;
		if lines.is_empty() {
			return Ok(template);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = (lines.len() + chunks - 1) / chunks;

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let mut partial = template.clone();

			thread::spawn(move || {
				for unit in chunk {
					if unit.split_whitespace().count() < MIN_UNIT_WORDS {
						continue;
					}
					partial.build(&unit);
				}
				tx.send(partial).expect("Failed to send from thread");
			});
		}
		drop(tx);

		let mut chain = template;
		for partial in rx.iter() {
			chain.merge(&partial)?;
		}

		Ok(chain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::io::Write;

	const CORPUS: &str = "the cat sat on the mat";

	fn built_chain(prefix_len: usize) -> Chain {
		let mut chain = Chain::new(prefix_len).unwrap();
		chain.build(CORPUS);
		chain
	}

	#[test]
	fn test_new_rejects_degenerate_prefix_len() {
		assert!(Chain::new(0).is_err());
		assert!(Chain::new(1).is_ok());
	}

	#[test]
	fn test_build_appends_once_per_word_per_mapping() {
		let chain = built_chain(2);
		let forward_total: usize = chain.forward.values().map(Vec::len).sum();
		let backward_total: usize = chain.backward.values().map(Vec::len).sum();
		assert_eq!(forward_total, 6);
		assert_eq!(backward_total, 6);
	}

	#[test]
	fn test_build_learns_expected_contexts() {
		let chain = built_chain(2);
		assert!(chain.forward["the cat"].contains(&"sat".to_owned()));
		assert!(chain.forward["sat on"].contains(&"the".to_owned()));
	}

	#[test]
	fn test_build_starts_a_fresh_window_per_unit() {
		let mut chain = Chain::new(1).unwrap();
		chain.build("alpha beta");
		chain.build("gamma delta");
		// Both units start from the placeholder context
		assert_eq!(chain.forward[""], vec!["alpha".to_owned(), "gamma".to_owned()]);
		// The placeholder is what precedes each unit's first word
		assert_eq!(chain.backward["alpha"], vec![Slot::Empty]);
		assert_eq!(chain.backward["gamma"], vec![Slot::Empty]);
	}

	#[test]
	fn test_generate_zero_words_is_empty() {
		assert_eq!(built_chain(2).generate(0), "");
	}

	#[test]
	fn test_generate_on_cold_chain_is_empty() {
		let chain = Chain::new(2).unwrap();
		assert_eq!(chain.generate(100), "");
	}

	#[test]
	fn test_generate_follows_single_candidate_corpus() {
		// Every context has exactly one continuation, so the walk is forced
		let mut chain = Chain::new(2).unwrap();
		chain.build("one two three four");
		assert_eq!(chain.generate(100), "one two three four");
		assert_eq!(chain.generate(2), "one two");
	}

	#[test]
	fn test_generate_is_deterministic_with_seeded_rng() {
		let chain = built_chain(2);
		let first = chain.generate_with_rng(&mut StdRng::seed_from_u64(7), 50);
		let second = chain.generate_with_rng(&mut StdRng::seed_from_u64(7), 50);
		assert!(!first.is_empty());
		assert_eq!(first, second);
	}

	#[test]
	fn test_generate_with_keyword_miss_is_empty() {
		assert_eq!(built_chain(2).generate_with_keyword("zzznotfound", 10), "");
	}

	#[test]
	fn test_generate_with_keyword_seeds_from_a_matching_context() {
		let chain = built_chain(2);
		let n = 2;
		let result = chain.generate_with_keyword("CAT", n);
		assert!(!result.is_empty());
		// The anchor is one of the contexts containing the keyword
		assert!(result.contains("the cat") || result.contains("cat sat"));
		let word_count = result.split_whitespace().count();
		assert!(word_count >= chain.prefix_len());
		assert!(word_count <= chain.prefix_len() + 2 * n);
	}

	#[test]
	fn test_generation_is_read_only() {
		let chain = built_chain(2);
		let forward = chain.forward.clone();
		let backward = chain.backward.clone();
		for _ in 0..10 {
			chain.generate(20);
			chain.generate_with_keyword("sat", 5);
			chain.generate_with_keyword("zzznotfound", 5);
		}
		assert_eq!(chain.forward, forward);
		assert_eq!(chain.backward, backward);
	}

	#[test]
	fn test_merge_concatenates_candidates() {
		let mut left = Chain::new(1).unwrap();
		left.build("hello world");
		let mut right = Chain::new(1).unwrap();
		right.build("hello there");

		left.merge(&right).unwrap();
		assert_eq!(left.forward["hello"], vec!["world".to_owned(), "there".to_owned()]);
	}

	#[test]
	fn test_merge_rejects_prefix_len_mismatch() {
		let mut left = Chain::new(1).unwrap();
		let right = Chain::new(2).unwrap();
		assert!(left.merge(&right).is_err());
	}

	#[test]
	fn test_from_corpus_file_skips_short_units() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "the cat sat on the mat").unwrap();
		writeln!(file, "ok then").unwrap();
		writeln!(file, "the dog slept on the rug").unwrap();
		file.flush().unwrap();

		let chain = Chain::from_corpus_file(file.path(), 2).unwrap();
		assert!(chain.forward.contains_key("the cat"));
		assert!(chain.forward.contains_key("the dog"));
		// Ingesting "ok then" would create the forward context " ok" and
		// the backward context "ok then"; neither may exist
		assert!(!chain.forward.contains_key(" ok"));
		assert!(!chain.backward.contains_key("ok then"));
		// Only the two six-word units may have contributed appends
		let forward_total: usize = chain.forward.values().map(Vec::len).sum();
		assert_eq!(forward_total, 12);
		assert_eq!(chain.prefix_len(), 2);
	}

	#[test]
	fn test_from_corpus_file_matches_sequential_build() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		for _ in 0..100 {
			writeln!(file, "{CORPUS}").unwrap();
		}
		file.flush().unwrap();

		let parallel = Chain::from_corpus_file(file.path(), 2).unwrap();
		let mut sequential = Chain::new(2).unwrap();
		for _ in 0..100 {
			sequential.build(CORPUS);
		}

		assert_eq!(parallel.context_count(), sequential.context_count());
		let parallel_total: usize = parallel.forward.values().map(Vec::len).sum();
		let sequential_total: usize = sequential.forward.values().map(Vec::len).sum();
		assert_eq!(parallel_total, sequential_total);
	}
}
