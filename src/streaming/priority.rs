//! Candidate chunks around the camera, ordered nearest first

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::streaming::coord::ChunkCoord;
use crate::terrain::settings::TerrainSettings;

/// A chunk within generate distance of the center
#[derive(Clone, Copy, Debug)]
pub struct ChunkCandidate {
    pub coord: ChunkCoord,
    /// Euclidean distance from the center chunk, in chunks
    pub distance: f64,
    /// Within view distance
    pub in_view: bool,
}

impl ChunkCandidate {
    pub fn new(center: ChunkCoord, coord: ChunkCoord, view_distance: f64) -> Self {
        let distance = center.distance(coord);
        Self {
            coord,
            distance,
            in_view: distance <= view_distance,
        }
    }
}

impl Eq for ChunkCandidate {}

impl PartialEq for ChunkCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for ChunkCandidate {
    /// Nearer first; equal distances fall back to coordinate order so a
    /// sorted batch is reproducible
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.coord.cmp(&other.coord))
    }
}

impl PartialOrd for ChunkCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Every chunk within generate distance of `center`
///
/// Covers `|dz| <= vertical_chunks` and horizontal offsets up to
/// `generate_distance`, keeping those whose Euclidean chunk distance is
/// within `generate_distance`. The result is sorted nearest first.
pub fn scan_candidates(center: ChunkCoord, settings: &TerrainSettings) -> Vec<ChunkCandidate> {
    let reach = settings.generate_distance;
    let vertical = settings.vertical_chunks;
    let generate = settings.generate_distance as f64;
    let view = settings.view_distance as f64;

    let side = (2 * reach + 1) as usize;
    let mut candidates = Vec::with_capacity(side * side * (2 * vertical + 1) as usize);
    for dz in -vertical..=vertical {
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let candidate = ChunkCandidate::new(center, center.offset(dx, dy, dz), view);
                if candidate.distance <= generate {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates.sort();
    candidates
}

/// Keys of the candidates within view distance
pub fn view_set(candidates: &[ChunkCandidate]) -> BTreeSet<ChunkCoord> {
    candidates
        .iter()
        .filter(|c| c.in_view)
        .map(|c| c.coord)
        .collect()
}
