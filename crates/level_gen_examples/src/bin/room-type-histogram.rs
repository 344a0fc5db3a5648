use std::collections::BTreeMap;

use level_gen::prelude::*;
use level_gen_examples::{init_tracing, room_histogram, sample_player};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Direct sampler draws along a ten-step walk.
    let expected = sample_player();
    let total = 10;
    let draws = 2000;
    let mut rng = StdRng::seed_from_u64(2025);
    for step in [0, 1, 2, 5, 9] {
        let mut counts: BTreeMap<RoomType, usize> = BTreeMap::new();
        for _ in 0..draws {
            *counts
                .entry(sample_room_type(&expected, step, total, &mut rng))
                .or_default() += 1;
        }
        let line = counts
            .iter()
            .map(|(ty, n)| format!("{}={:.2}", ty.glyph(), *n as f64 / draws as f64))
            .collect::<Vec<_>>()
            .join(" ");
        println!("step {step:>2}/{total}: {line}");
    }

    // Same distribution as it lands in a whole level.
    let weights = LimitNormalized;
    let mut content = BasicContentSource::new();
    let mut generator = LevelGenerator::try_new(GenerationConfig::default(), &weights, &mut content)?;
    let level = generator.generate(&LevelRequest::new(7, expected), &mut rng)?;
    println!();
    println!("Level {} room types:", level.number);
    print!("{}", room_histogram(&level));

    Ok(())
}
