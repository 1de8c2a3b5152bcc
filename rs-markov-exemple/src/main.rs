use rs_markov_core::model::chain::Chain;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A chain with a context window of 2 words
    // (3 suits a real corpus; 2 works better on one this tiny)
    let mut chain = Chain::new(2)?;

    // Each call feeds one corpus unit; the context window restarts per unit
    // but every unit accumulates into the same chain
    chain.build("the cat sat on the mat");
    chain.build("the cat chased the mouse around the yard");
    chain.build("the dog slept on the mat all day");

    println!("Learned {} contexts", chain.context_count());

    // Unconstrained generation: starts cold, walks the forward mapping and
    // stops after 20 words or on a context with no recorded continuation
    for i in 0..5 {
        println!("Generated {}: {}", i + 1, chain.generate(20));
    }

    // Keyword-anchored generation: seeds on a context containing the keyword
    // (case-insensitive substring) and grows the text in both directions
    println!("About the cat: {}", chain.generate_with_keyword("cat", 10));

    // No matching context yields an empty string, never an error;
    // picking a fallback phrase is the caller's job
    let reply = chain.generate_with_keyword("submarine", 10);
    if reply.is_empty() {
        println!("No context mentions 'submarine'");
    }

    // Chains with the same context length can be merged, e.g. when a large
    // corpus is ingested in parallel
    let mut other = Chain::new(2)?;
    other.build("the mouse hid under the mat");
    chain.merge(&other)?;
    println!("After merge: {} contexts", chain.context_count());

    // Merging chains with different context lengths is refused
    let mismatched = Chain::new(3)?;
    match chain.merge(&mismatched) {
        Ok(_) => println!("Should not happen"),
        Err(_) => println!("Cannot merge chains with different context lengths"),
    }

    Ok(())
}
