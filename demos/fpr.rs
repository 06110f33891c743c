#![allow(clippy::uninlined_format_args)]

use blockbloom::{
    BloomFilter, BloomFilterConfigBuilder, CacheAlignedBloomFilter, CacheAlignedMixer,
    DoubleHashMixer, Mixer,
};
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use rand::{Rng, distr::Alphanumeric};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

const FILL_RATIO: f64 = 1.0; // Fill the filter to its configured capacity
const TEST_SAMPLES: usize = 100_000; // Number of unknown elements to test for FPR

fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

struct Outcome {
    bit_count: usize,
    num_hashes: usize,
    true_positives: usize,
    false_positives: usize,
    predicted_fpr: f64,
}

fn measure<M: Mixer>(
    mut filter: BloomFilter<str, M>,
    known: &[String],
    known_set: &HashSet<String>,
) -> Outcome {
    for element in known {
        filter.insert(element);
    }

    let true_positives = known.iter().filter(|e| filter.might_contain(e)).count();

    let mut false_positives = 0;
    let mut tested = 0;
    while tested < TEST_SAMPLES {
        let unknown = generate_random_string(32);
        if known_set.contains(&unknown) {
            continue;
        }
        tested += 1;
        if filter.might_contain(&unknown) {
            false_positives += 1;
        }
    }

    Outcome {
        bit_count: filter.params().bit_count(),
        num_hashes: filter.params().num_hashes(),
        true_positives,
        false_positives,
        predicted_fpr: filter.current_fpr(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║          Bloom Filter - False Positive Rate Tester        ║");
    println!("╚═══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  • Fill Ratio: {}%", FILL_RATIO * 100.0);
    println!("  • Test Samples: {}", TEST_SAMPLES);

    let capacities = [1_000, 10_000, 100_000];
    let target_fprs = [0.001, 0.01, 0.1];

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Layout").set_alignment(CellAlignment::Center),
            Cell::new("Capacity").set_alignment(CellAlignment::Center),
            Cell::new("Target FPR").set_alignment(CellAlignment::Center),
            Cell::new("m / k").set_alignment(CellAlignment::Center),
            Cell::new("Known Positives").set_alignment(CellAlignment::Center),
            Cell::new("False Positives").set_alignment(CellAlignment::Center),
            Cell::new("Observed FPR").set_alignment(CellAlignment::Center),
            Cell::new("Predicted FPR").set_alignment(CellAlignment::Center),
            Cell::new("Deviation").set_alignment(CellAlignment::Center),
        ]);

    for &capacity in &capacities {
        for &target_fpr in &target_fprs {
            let insert_count = (capacity as f64 * FILL_RATIO) as usize;

            print!(
                "Testing capacity={}, target_fpr={:.2}%: ",
                capacity,
                target_fpr * 100.0
            );
            let known: Vec<String> =
                (0..insert_count).map(|_| generate_random_string(32)).collect();
            let known_set: HashSet<String> = known.iter().cloned().collect();

            let config = BloomFilterConfigBuilder::default()
                .capacity(capacity)
                .false_positive_rate(target_fpr)
                .build()?;

            let standard: BloomFilter<str, DoubleHashMixer> =
                BloomFilter::from_config(config.clone())?;
            let aligned: CacheAlignedBloomFilter<str> =
                BloomFilter::<str, CacheAlignedMixer>::from_config(config)?;

            for (layout, outcome) in [
                ("standard", measure(standard, &known, &known_set)),
                ("cache-aligned", measure(aligned, &known, &known_set)),
            ] {
                let observed_fpr = outcome.false_positives as f64 / TEST_SAMPLES as f64;
                let deviation = (observed_fpr - target_fpr) / target_fpr * 100.0;

                table.add_row(vec![
                    Cell::new(layout),
                    Cell::new(format!("{}", capacity)),
                    Cell::new(format!("{:.2}%", target_fpr * 100.0)),
                    Cell::new(format!("{} / {}", outcome.bit_count, outcome.num_hashes)),
                    Cell::new(format!("{}/{}", outcome.true_positives, known.len())),
                    Cell::new(format!("{}/{}", outcome.false_positives, TEST_SAMPLES)),
                    Cell::new(format!("{:.4}%", observed_fpr * 100.0)),
                    Cell::new(format!("{:.4}%", outcome.predicted_fpr * 100.0)),
                    Cell::new(format!("{:+.2}%", deviation)),
                ]);
            }

            println!("Done!");
        }
    }

    println!("\nResults:");
    println!("{}", table);

    println!("\nSummary:");
    println!("Known positives must always equal the number of inserted elements.");
    println!("The standard layout tracks the target rate closely at capacity;");
    println!("the cache-aligned layout trades a somewhat higher rate for touching");
    println!("a single cache line per operation.");

    Ok(())
}
