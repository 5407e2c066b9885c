//! Synthetic measurement files for benchmarks and large-input tests.

use std::io::{self, Write};

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Weather stations and their mean temperature
pub const STATIONS: [(&str, f64); 24] = [
    ("Abha", 18.0),
    ("Abéché", 29.4),
    ("Adelaide", 17.3),
    ("Anchorage", 2.8),
    ("Bergen", 7.7),
    ("Bosaso", 30.0),
    ("Cabo San Lucas", 23.9),
    ("Dakar", 24.0),
    ("Halifax", 7.5),
    ("Hamburg", 9.7),
    ("Irkutsk", 1.0),
    ("Kunming", 15.7),
    ("Lhasa", 7.6),
    ("Nuuk", -1.4),
    ("Oslo", 5.7),
    ("Ouagadougou", 28.3),
    ("Petropavlovsk-Kamchatsky", 1.9),
    ("São Paulo", 19.7),
    ("Tromsø", 2.9),
    ("Ürümqi", 7.4),
    ("Vostok", -54.8),
    ("Yakutsk", -8.8),
    ("Zagreb", 10.7),
    ("Zürich", 9.3),
];

/// Writes `rows` lines of `name;temp` with one fractional digit. The same
/// seed always produces the same file.
pub fn write_measurements<W: Write>(mut out: W, rows: u64, seed: u64) -> io::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..rows {
        let (name, mean) = STATIONS[rng.gen_range(0..STATIONS.len())];
        let temp: f64 = (mean + rng.gen_range(-10.0..10.0)).clamp(-99.9, 99.9);
        writeln!(out, "{};{:.1}", name, temp)?;
    }
    out.flush()
}

pub fn measurements(rows: u64, seed: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(rows as usize * 16);
    write_measurements(&mut buf, rows, seed).expect("writing to a Vec");
    buf
}
