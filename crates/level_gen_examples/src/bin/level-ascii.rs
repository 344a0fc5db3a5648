use level_gen::prelude::*;
use level_gen_examples::{init_tracing, sample_player};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Level 4 is the first level on the grown 12x12 grid.
    let level_number = 4;
    let request = LevelRequest::new(level_number, sample_player()).with_luck(0.25);

    let weights = LimitNormalized;
    let mut content = BasicContentSource::new();
    let mut generator = LevelGenerator::try_new(GenerationConfig::default(), &weights, &mut content)?;

    let mut rng = StdRng::seed_from_u64(2025);
    let level = generator.generate(&request, &mut rng)?;

    println!("Level {} ({} rooms)", level.number, level.room_count());
    println!("start {} -> end {}", level.start, level.end);
    println!();
    println!("Carving:");
    print!("{}", level.grid.render_ascii());
    println!();
    println!("Distances:");
    print!("{}", level.grid.render_distances());
    println!();
    println!("Rooms:");
    print!("{}", level.render_rooms());

    Ok(())
}
