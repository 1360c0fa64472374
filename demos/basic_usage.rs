//! Basic usage examples for shaped-bloom

use shaped_bloom::{BloomFilter, BloomHandle, ErrorPolicy, SerializedForm};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Shaped Bloom Filter Examples ===\n");

    // Example 1: Filter sized from estimates
    println!("1. Bloom Filter from estimates:");
    let mut bloom = BloomFilter::with_estimates(1000, 0.01)?;
    println!(
        "  m = {} bits, k = {} hashes",
        bloom.capacity(),
        bloom.hash_count()
    );

    for word in ["alpha", "beta"] {
        bloom.add(word.as_bytes());
    }
    for word in ["alpha", "beta", "gamma"] {
        println!("  {:?} in filter: {}", word, bloom.test(word.as_bytes()));
    }
    println!();

    // Example 2: Integer keys
    println!("2. Integer keys:");
    bloom.add_many(&[1, 2, 3]);
    println!("  test_many([1, 2, 3, 4]) = {:?}", bloom.test_many(&[1, 2, 3, 4]));
    println!("  {}", bloom.stats());
    println!();

    // Example 3: Export and restore
    println!("3. Serialization:");
    let encoded = bloom.export().to_bytes()?;
    println!("  Canonical encoding: {} bytes", encoded.len());
    let restored = BloomFilter::from_form(&SerializedForm::from_bytes(&encoded)?)?;
    println!("  Restored filter equal: {}", restored == bloom);
    println!();

    // Example 4: Boundary handle
    println!("4. Handle lifecycle:");
    let mut handle = BloomHandle::open_with_estimates(10, 0.01)?;
    println!("  b_length before add: {}", handle.byte_length());
    handle.add_many(&[1, 5, 6]);
    println!("  b_length after add: {}", handle.byte_length());
    println!("  members of 0..10: {:?}", handle.test_many(&(0..10).collect::<Vec<_>>()));
    handle.close();
    println!();

    // Example 5: Errors are values
    println!("5. Error handling:");
    let err = ErrorPolicy::Return
        .apply(BloomFilter::from_serialized(64, 4, &[0, 0]))
        .unwrap_err();
    println!("  {}", err);

    Ok(())
}
