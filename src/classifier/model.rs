// Per-symbol and joint models with their store encoding
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::recognizer::{ClassifierError, ClassifierResult};
use super::knn::{common_dimension, JointModel, NearestNeighbors};
use super::tolerance::compute_tolerance_distance;
use crate::features::FeatureVector;
use crate::state::{ArtifactKey, ArtifactKind, ModelStore, Partition};

/// Neighbors averaged when a query is checked against one symbol
pub const SYMBOL_NEIGHBORS: usize = 2;

/// Voters consulted by the joint model
pub const JOINT_NEIGHBORS: usize = 5;

fn encode<T: Serialize + ?Sized>(value: &T) -> ClassifierResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn load_required<T: DeserializeOwned>(
    store: &dyn ModelStore,
    key: ArtifactKey,
) -> ClassifierResult<T> {
    match store.get_artifact(&key)? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Err(ClassifierError::MissingArtifact(key)),
    }
}

/// Everything learned about one symbol
#[derive(Debug, Clone)]
pub struct SymbolModel {
    pub symbol: String,
    pub training_samples: Vec<FeatureVector>,
    pub neighbor_index: NearestNeighbors,
    pub tolerance_distance: f64,
}

impl SymbolModel {
    pub fn train(symbol: &str, training_samples: Vec<FeatureVector>) -> ClassifierResult<Self> {
        let tolerance_distance =
            compute_tolerance_distance(&training_samples).ok_or(ClassifierError::EmptyTrainingSet)?;
        let neighbor_index = NearestNeighbors::fit(SYMBOL_NEIGHBORS, training_samples.clone());

        Ok(Self {
            symbol: symbol.to_string(),
            training_samples,
            neighbor_index,
            tolerance_distance,
        })
    }

    /// Mean distance from `query` to the symbol's closest samples
    pub fn mean_distance(&self, query: &[f64]) -> Option<f64> {
        self.neighbor_index.mean_distance(query)
    }

    pub fn save(&self, store: &dyn ModelStore, partition: Partition) -> ClassifierResult<()> {
        save_training_set(store, partition, &self.symbol, &self.training_samples)?;
        store.put_artifact(
            &ArtifactKey::symbol(partition, &self.symbol, ArtifactKind::NeighborIndex),
            &encode(&self.neighbor_index)?,
        )?;
        store.put_artifact(
            &ArtifactKey::symbol(partition, &self.symbol, ArtifactKind::Tolerance),
            &encode(&self.tolerance_distance)?,
        )?;
        Ok(())
    }

    pub fn load(store: &dyn ModelStore, partition: Partition, symbol: &str) -> ClassifierResult<Self> {
        let training_samples = load_training_set(store, partition, symbol)?;
        let index_key = ArtifactKey::symbol(partition, symbol, ArtifactKind::NeighborIndex);
        let neighbor_index: NearestNeighbors = load_required(store, index_key.clone())?;
        if neighbor_index.dimension() != common_dimension(&training_samples) {
            return Err(ClassifierError::Inconsistent(index_key));
        }
        let tolerance_distance = load_required(
            store,
            ArtifactKey::symbol(partition, symbol, ArtifactKind::Tolerance),
        )?;

        Ok(Self {
            symbol: symbol.to_string(),
            training_samples,
            neighbor_index,
            tolerance_distance,
        })
    }

    /// Drop every artifact of a symbol, returning how many existed
    pub fn delete(store: &dyn ModelStore, partition: Partition, symbol: &str) -> ClassifierResult<usize> {
        let mut deleted = 0;
        for kind in ArtifactKind::PER_SYMBOL {
            if store.delete_artifact(&ArtifactKey::symbol(partition, symbol, kind))? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

pub fn save_training_set(
    store: &dyn ModelStore,
    partition: Partition,
    symbol: &str,
    samples: &[FeatureVector],
) -> ClassifierResult<()> {
    store.put_artifact(
        &ArtifactKey::symbol(partition, symbol, ArtifactKind::TrainingSet),
        &encode(samples)?,
    )?;
    Ok(())
}

pub fn load_training_set(
    store: &dyn ModelStore,
    partition: Partition,
    symbol: &str,
) -> ClassifierResult<Vec<FeatureVector>> {
    let key = ArtifactKey::symbol(partition, symbol, ArtifactKind::TrainingSet);
    let samples: Vec<FeatureVector> = load_required(store, key.clone())?;
    if !samples.is_empty() && common_dimension(&samples).is_none() {
        return Err(ClassifierError::Inconsistent(key));
    }
    Ok(samples)
}

pub fn save_joint_model(
    store: &dyn ModelStore,
    partition: Partition,
    model: &JointModel,
) -> ClassifierResult<()> {
    store.put_artifact(&ArtifactKey::joint(partition), &encode(model)?)?;
    Ok(())
}

/// `Ok(None)` when the partition has no joint model yet
pub fn load_joint_model(
    store: &dyn ModelStore,
    partition: Partition,
) -> ClassifierResult<Option<JointModel>> {
    let key = ArtifactKey::joint(partition);
    match load_required::<JointModel>(store, key.clone()) {
        Ok(model) if model.dimension().is_none() => Err(ClassifierError::Inconsistent(key)),
        Ok(model) => Ok(Some(model)),
        Err(ClassifierError::MissingArtifact(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn delete_joint_model(store: &dyn ModelStore, partition: Partition) -> ClassifierResult<bool> {
    Ok(store.delete_artifact(&ArtifactKey::joint(partition))?)
}
