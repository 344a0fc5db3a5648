use level_gen::prelude::*;
use level_gen_examples::{init_tracing, sample_player};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GenerationConfig::default();
    let weights = LimitNormalized;
    let mut content = BasicContentSource::new();
    let mut generator = LevelGenerator::try_new(config, &weights, &mut content)?;

    // Keep only the summary events; room placement would flood the output.
    let mut sink = VecSink::only([
        GenerationEventKind::ClusterReconciled,
        GenerationEventKind::EndPromoted,
        GenerationEventKind::Warning,
    ]);

    let seeds = 16u64;
    info!("Sweeping {} seeds over levels 1, 5 and 9.", seeds);
    println!("seed  level  grid  clusters  rooms  density  dead-ends  promoted");
    for seed in 0..seeds {
        for level_number in [1, 5, 9] {
            sink.clear();
            let mut rng = StdRng::seed_from_u64(seed);
            let request = LevelRequest::new(level_number, sample_player());
            let level = generator.generate_with_events(&request, &mut rng, &mut sink, &mut ())?;

            let dead_ends: usize = sink
                .as_slice()
                .iter()
                .map(|event| match event {
                    GenerationEvent::ClusterReconciled { dead_ends, .. } => *dead_ends,
                    _ => 0,
                })
                .sum();
            println!(
                "{seed:>4}  {level_number:>5}  {:>4}  {:>8}  {:>5}  {:>7.2}  {:>9}  {:>8}",
                level.grid.width,
                level.clusters.len(),
                level.room_count(),
                level.density(),
                dead_ends,
                sink.count(GenerationEventKind::EndPromoted),
            );
        }
    }

    Ok(())
}
