// Acceptance threshold of a symbol
use super::knn::NearestNeighbors;
use crate::features::FeatureVector;

/// Neighbors queried per training sample, the sample itself included
const SELF_NEIGHBORS: usize = 3;

/// Share of training samples that must fall inside the tolerance
const PERCENTILE: f64 = 0.8;

/// Slack applied on top of the percentile distance
const TOLERANCE_FACTOR: f64 = 1.3;

/// Distance under which a query counts as the symbol.
///
/// Every sample's two closest companions are averaged, the averages sorted
/// and the one at rank `ceil(0.8 * n) - 1` scaled by 1.3. `None` for an
/// empty set.
pub fn compute_tolerance_distance(samples: &[FeatureVector]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let index = NearestNeighbors::fit(SELF_NEIGHBORS, samples.to_vec());
    let mut averages: Vec<f64> = samples
        .iter()
        .map(|sample| {
            let others: Vec<f64> = index
                .kneighbors(sample, SELF_NEIGHBORS)
                .into_iter()
                .skip(1)
                .map(|(_, distance)| distance)
                .collect();
            if others.is_empty() {
                0.0
            } else {
                others.iter().sum::<f64>() / others.len() as f64
            }
        })
        .collect();
    averages.sort_by(f64::total_cmp);

    let rank = ((PERCENTILE * averages.len() as f64).ceil() as usize).saturating_sub(1);
    Some(averages[rank] * TOLERANCE_FACTOR)
}
