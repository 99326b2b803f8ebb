// Symbol classifier: training sessions, retraining and open-set recognition
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::knn::JointModel;
use super::model::{
    delete_joint_model, load_joint_model, load_training_set, save_joint_model, save_training_set,
    SymbolModel, JOINT_NEIGHBORS,
};
use super::registry::SymbolRegistry;
use crate::features::FeatureVector;
use crate::state::{ArtifactKey, ArtifactKind, ModelStore, Partition, StoreError};

/// Smallest number of strokes a training session may ask for
pub const MIN_TRAINING_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Training size {requested} is below the minimum of {minimum}")]
    TrainingSizeTooSmall { requested: usize, minimum: usize },
    #[error("No training session in progress")]
    NoTrainingSession,
    #[error("Missing artifact {0}")]
    MissingArtifact(ArtifactKey),
    #[error("Artifact {0} mixes vectors of different lengths")]
    Inconsistent(ArtifactKey),
    #[error("Cannot learn from an empty training set")]
    EmptyTrainingSet,
    #[error("Invalid symbol name '{0}'")]
    InvalidSymbolName(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Corrupt artifact: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Strokes collected for one symbol until the target count is reached
#[derive(Debug, Clone)]
pub struct TrainingSession {
    symbol: String,
    target: usize,
    samples: Vec<FeatureVector>,
}

impl TrainingSession {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn collected(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingProgress {
    /// More strokes are needed
    Collected { collected: usize, target: usize },
    /// The symbol was retrained and the session is over
    Completed { symbol: String, tolerance: f64 },
}

impl TrainingProgress {
    pub fn is_completed(&self) -> bool {
        matches!(self, TrainingProgress::Completed { .. })
    }
}

/// Listing row for one registered symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub name: String,
    pub active: bool,
    pub samples: Option<usize>,
    pub tolerance: Option<f64>,
}

pub struct Classifier {
    partition: Partition,
    store: Arc<dyn ModelStore>,
    registry: SymbolRegistry,
    session: Option<TrainingSession>,
    models: HashMap<String, SymbolModel>,
    joint: Option<JointModel>,
}

impl Classifier {
    /// Load whatever the partition has. Symbols with incomplete artifacts are
    /// skipped, the joint model is optional.
    pub fn new(store: Arc<dyn ModelStore>, partition: Partition) -> ClassifierResult<Self> {
        let registry = SymbolRegistry::load(store.as_ref(), partition)?;

        let mut models = HashMap::new();
        for name in registry.names() {
            match SymbolModel::load(store.as_ref(), partition, &name) {
                Ok(model) => {
                    models.insert(name, model);
                }
                Err(ClassifierError::MissingArtifact(key)) => {
                    log::debug!("Symbol '{}' is not fully trained, missing {}", name, key);
                }
                Err(e) => return Err(e),
            }
        }

        let joint = load_joint_model(store.as_ref(), partition)?;

        log::debug!(
            "Loaded {} of {} symbols for {} (joint model: {})",
            models.len(),
            registry.len(),
            partition,
            joint.is_some()
        );

        Ok(Self {
            partition,
            store,
            registry,
            session: None,
            models,
            joint,
        })
    }

    /// Like `new`, but refuses a partition that cannot recognize anything:
    /// the joint model and every active symbol's artifacts must exist.
    pub fn open_for_recognition(
        store: Arc<dyn ModelStore>,
        partition: Partition,
    ) -> ClassifierResult<Self> {
        let classifier = Self::new(store, partition)?;

        for name in classifier.registry.active_names() {
            if !classifier.models.contains_key(&name) {
                // Reload to surface the exact artifact that is missing
                SymbolModel::load(classifier.store.as_ref(), partition, &name)?;
            }
        }
        if classifier.joint.is_none() {
            return Err(ClassifierError::MissingArtifact(ArtifactKey::joint(partition)));
        }

        log::info!(
            "Recognizing {} symbols of {}",
            classifier.registry.active_names().len(),
            partition
        );
        Ok(classifier)
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    pub fn session(&self) -> Option<&TrainingSession> {
        self.session.as_ref()
    }

    pub fn has_joint_model(&self) -> bool {
        self.joint.is_some()
    }

    pub fn model(&self, symbol: &str) -> Option<&SymbolModel> {
        self.models.get(symbol)
    }

    // ==================== TRAINING ====================

    /// Start collecting `target_count` strokes of `symbol`
    pub fn reset_training_set(&mut self, target_count: usize, symbol: &str) -> ClassifierResult<()> {
        if target_count < MIN_TRAINING_SIZE {
            return Err(ClassifierError::TrainingSizeTooSmall {
                requested: target_count,
                minimum: MIN_TRAINING_SIZE,
            });
        }
        validate_symbol_name(symbol)?;

        log::info!(
            "Training '{}' in {}: draw it {} times",
            symbol,
            self.partition,
            target_count
        );
        self.session = Some(TrainingSession {
            symbol: symbol.to_string(),
            target: target_count,
            samples: Vec::with_capacity(target_count),
        });
        Ok(())
    }

    /// Add one stroke to the session. The stroke that reaches the target
    /// retrains the symbol and the joint model and ends the session. If that
    /// fails the session stays open without the last stroke.
    pub fn add_to_training_set(
        &mut self,
        feature_vector: FeatureVector,
    ) -> ClassifierResult<TrainingProgress> {
        let session = self
            .session
            .as_mut()
            .ok_or(ClassifierError::NoTrainingSession)?;
        session.samples.push(feature_vector);

        let collected = session.samples.len();
        let target = session.target;
        log::info!("Collected {}/{} strokes of '{}'", collected, target, session.symbol);
        if collected < target {
            return Ok(TrainingProgress::Collected { collected, target });
        }

        let symbol = session.symbol.clone();
        let samples = session.samples.clone();
        match self.complete_session(&symbol, samples) {
            Ok(tolerance) => {
                self.session = None;
                Ok(TrainingProgress::Completed { symbol, tolerance })
            }
            Err(e) => {
                log::error!("Failed to save '{}', draw the last stroke again: {}", symbol, e);
                if let Some(session) = self.session.as_mut() {
                    session.samples.pop();
                }
                Err(e)
            }
        }
    }

    fn complete_session(
        &mut self,
        symbol: &str,
        samples: Vec<FeatureVector>,
    ) -> ClassifierResult<f64> {
        save_training_set(self.store.as_ref(), self.partition, symbol, &samples)?;
        let tolerance = self.fit_symbol(symbol, samples)?;

        self.registry.register(symbol);
        self.registry.save(self.store.as_ref())?;
        self.learn_all_symbols_together()?;
        Ok(tolerance)
    }

    /// Refit a symbol from its stored training set, returning the new tolerance
    pub fn learn_one_symbol(&mut self, symbol: &str) -> ClassifierResult<f64> {
        let samples = match &self.session {
            Some(session) if session.symbol == symbol && !session.samples.is_empty() => {
                session.samples.clone()
            }
            _ => load_training_set(self.store.as_ref(), self.partition, symbol)?,
        };
        self.fit_symbol(symbol, samples)
    }

    fn fit_symbol(&mut self, symbol: &str, samples: Vec<FeatureVector>) -> ClassifierResult<f64> {
        let model = SymbolModel::train(symbol, samples)?;
        model.save(self.store.as_ref(), self.partition)?;

        let tolerance = model.tolerance_distance;
        log::info!(
            "Learned '{}' from {} strokes, tolerance {:.4}",
            symbol,
            model.training_samples.len(),
            tolerance
        );
        self.models.insert(symbol.to_string(), model);
        Ok(tolerance)
    }

    /// Rebuild the joint model over every active symbol, or delete it when
    /// no active symbol is left
    pub fn learn_all_symbols_together(&mut self) -> ClassifierResult<()> {
        let mut labeled = Vec::new();
        for name in self.registry.active_names() {
            let samples = match self.models.get(&name) {
                Some(model) => model.training_samples.clone(),
                None => load_training_set(self.store.as_ref(), self.partition, &name)?,
            };
            labeled.extend(samples.into_iter().map(|sample| (name.clone(), sample)));
        }

        match JointModel::fit(JOINT_NEIGHBORS, labeled) {
            Some(joint) => {
                save_joint_model(self.store.as_ref(), self.partition, &joint)?;
                log::info!(
                    "Rebuilt joint model of {} from {} strokes of {} symbols",
                    self.partition,
                    joint.len(),
                    joint.labels().len()
                );
                self.joint = Some(joint);
            }
            None => {
                if delete_joint_model(self.store.as_ref(), self.partition)? {
                    log::info!("No symbols left in {}, joint model deleted", self.partition);
                }
                self.joint = None;
            }
        }
        Ok(())
    }

    /// Refit every registered symbol from storage, then the joint model
    pub fn relearn_all_symbols(&mut self) -> ClassifierResult<usize> {
        let names = self.registry.names();
        for name in &names {
            self.learn_one_symbol(name)?;
        }
        self.learn_all_symbols_together()?;
        Ok(names.len())
    }

    // ==================== RECOGNITION ====================

    /// The symbol the stroke was drawn as, or `None` when nothing is close
    /// enough
    pub fn classify(&self, feature_vector: &[f64]) -> Option<String> {
        let joint = self.joint.as_ref()?;
        if joint.dimension() != Some(feature_vector.len()) {
            log::warn!(
                "Ignoring a feature vector of length {}, models expect {:?}",
                feature_vector.len(),
                joint.dimension()
            );
            return None;
        }
        let candidate = joint.predict(feature_vector)?;
        let Some(model) = self.models.get(candidate) else {
            log::warn!("Joint model proposed '{}' which has no model", candidate);
            return None;
        };

        let distance = model.mean_distance(feature_vector)?;
        if distance < model.tolerance_distance {
            log::debug!(
                "Recognized '{}' (distance {:.4} < {:.4})",
                candidate,
                distance,
                model.tolerance_distance
            );
            Some(candidate.to_string())
        } else {
            log::debug!(
                "Rejected candidate '{}' (distance {:.4} >= {:.4})",
                candidate,
                distance,
                model.tolerance_distance
            );
            None
        }
    }

    // ==================== REGISTRY MAINTENANCE ====================

    pub fn delete_symbol(&mut self, symbol: &str) -> ClassifierResult<bool> {
        Ok(self.delete_symbols(&[symbol])? == 1)
    }

    /// Remove symbols and their artifacts. Unknown names are skipped with a
    /// warning. Returns how many were removed.
    pub fn delete_symbols<S: AsRef<str>>(&mut self, symbols: &[S]) -> ClassifierResult<usize> {
        let mut removed = 0;
        for symbol in symbols {
            let symbol = symbol.as_ref();
            if !self.registry.remove(symbol) {
                log::warn!("Cannot delete '{}': not in the {} registry", symbol, self.partition);
                continue;
            }
            SymbolModel::delete(self.store.as_ref(), self.partition, symbol)?;
            self.models.remove(symbol);
            log::info!("Deleted '{}' from {}", symbol, self.partition);
            removed += 1;
        }

        if removed > 0 {
            self.registry.save(self.store.as_ref())?;
            self.learn_all_symbols_together()?;
        }
        Ok(removed)
    }

    pub fn delete_all_symbols(&mut self) -> ClassifierResult<usize> {
        let names = self.registry.names();
        self.delete_symbols(&names)
    }

    pub fn activate_symbols<S: AsRef<str>>(&mut self, symbols: &[S]) -> ClassifierResult<usize> {
        self.set_active(symbols, true)
    }

    pub fn deactivate_symbols<S: AsRef<str>>(&mut self, symbols: &[S]) -> ClassifierResult<usize> {
        self.set_active(symbols, false)
    }

    fn set_active<S: AsRef<str>>(&mut self, symbols: &[S], active: bool) -> ClassifierResult<usize> {
        let mut changed = 0;
        for symbol in symbols {
            let symbol = symbol.as_ref();
            match self.registry.set_active(symbol, active) {
                Some(true) => changed += 1,
                Some(false) => {}
                None => log::warn!("Unknown symbol '{}' in {}", symbol, self.partition),
            }
        }

        if changed > 0 {
            self.registry.save(self.store.as_ref())?;
            self.learn_all_symbols_together()?;
        }
        Ok(changed)
    }

    pub fn summaries(&self) -> Vec<SymbolSummary> {
        self.registry
            .entries()
            .iter()
            .map(|entry| {
                let model = self.models.get(&entry.name);
                SymbolSummary {
                    name: entry.name.clone(),
                    active: entry.active,
                    samples: model.map(|m| m.training_samples.len()),
                    tolerance: model.map(|m| m.tolerance_distance),
                }
            })
            .collect()
    }
}

fn validate_symbol_name(symbol: &str) -> ClassifierResult<()> {
    if symbol.trim().is_empty() || symbol.trim() != symbol || symbol.contains('/') {
        return Err(ClassifierError::InvalidSymbolName(symbol.to_string()));
    }
    Ok(())
}

/// Artifact kinds a fully trained symbol has
pub fn required_artifacts(partition: Partition, symbol: &str) -> Vec<ArtifactKey> {
    ArtifactKind::PER_SYMBOL
        .iter()
        .map(|kind| ArtifactKey::symbol(partition, symbol, *kind))
        .collect()
}
