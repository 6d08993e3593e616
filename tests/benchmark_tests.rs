//! Performance benchmarks for the grid, the tick loop and the wire format

use server::config::MatchConfig;
use server::game::{EngineEvent, MatchEngine, MatchStatus, PlayerLink};
use server::grid::Grid;
use shared::{slot_color, Coordinate, Packet, TrailInfo, Trails};
use std::time::Instant;

/// Benchmarks occupancy reads and writes
#[test]
fn benchmark_grid_occupancy() {
    let mut grid = Grid::new(256, 256);

    let iterations = 1_000_000;
    let start = Instant::now();

    let mut hits = 0usize;
    for i in 0..iterations {
        let cell = Coordinate::new((i % 300) as i32 - 20, (i / 300 % 300) as i32 - 20);
        grid.set(cell, i % 2 == 0);
        if grid.occupied(cell) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Grid occupancy: {} iterations in {:?} ({:.2} ns/iter, {} hits)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64,
        hits
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks whole matches of four players meeting in the middle
#[test]
fn benchmark_full_matches() {
    let config = MatchConfig::default();

    let matches = 1_000;
    let mut ticks = 0u64;
    let start = Instant::now();

    for i in 0..matches {
        let mut engine = MatchEngine::new(format!("bench-{}", i), 64, 64, &config);
        let _links: Vec<PlayerLink> = (0..4).map(|_| engine.add_player().unwrap()).collect();

        while engine.handle(EngineEvent::Tick) == MatchStatus::Running {}
        ticks += engine.tick();
    }

    let duration = start.elapsed();
    println!(
        "Full matches: {} matches, {} ticks in {:?} ({:.2} μs/tick)",
        matches,
        ticks,
        duration,
        duration.as_micros() as f64 / ticks as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks a long-running solo match with trail eviction every tick
#[test]
fn benchmark_trail_eviction() {
    let config = MatchConfig {
        trail_limit: Some(50),
        ..MatchConfig::default()
    };
    let mut engine = MatchEngine::new("bench".to_string(), 256, 256, &config);
    let _link = engine.add_player().unwrap();

    let start = Instant::now();
    for _ in 0..250 {
        assert_eq!(engine.handle(EngineEvent::Tick), MatchStatus::Running);
    }

    let duration = start.elapsed();
    println!("Trail eviction: 250 ticks in {:?}", duration);

    assert_eq!(engine.grid().occupied_count(), 51);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks frame serialization performance
#[test]
fn benchmark_frame_serialization() {
    use bincode::{deserialize, serialize};

    let mut trails = Trails::new();
    for slot in 0..4 {
        trails.insert(
            slot,
            TrailInfo {
                coordinates: (0..100).map(|y| Coordinate::new(slot as i32, y)).collect(),
                color: slot_color(slot).to_string(),
            },
        );
    }
    let packet = Packet::Frame { tick: 12345, trails };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Frame serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}
