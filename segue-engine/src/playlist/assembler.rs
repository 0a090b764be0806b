//! Playlist Assembler
//!
//! Runs the assembly pipeline for one seed. Stages run sequentially; the
//! cancellation token is checked before every stage and after every batch of
//! vector computations.
//!
//! # Stages
//! 1. **SeedValidation**: configuration check, seed must have a usable tempo
//! 2. **CandidateCollection**: pull from the `CandidateSource`, drop the seed
//!    and duplicate ids, cap at `max_candidates`
//! 3. **Filtering**: tempo presence, tempo tolerance, descriptor quality.
//!    Nothing left → `NoCompatibleCandidates`
//! 4. **CompatibilityRanking**: vectors computed and assessed by the vector
//!    gate in parallel batches, ranked against the seed vector, top `length`
//!    above `min_similarity` kept
//! 5. **EnergyOrdering**: order the selection along the energy curve
//! 6. **FinalQualityCheck**: playlist gate, `underfilled` flag
//!
//! Assembler instances are `Send + Sync`; concurrent `assemble` calls share
//! only the vector cache and the genre matrix.
//!
//! An optional event channel receives stage and batch progress. Events are
//! dropped when the channel is full or closed.

use super::filtering::{filter_candidates, FilteredCandidate};
use super::ordering::order_by_curve;
use super::{AssemblyConfig, AssemblyEvent, AssemblyStage, CandidateSource, Playlist, PlaylistEntry, PlaylistSummary};
use crate::compatibility::{CompatibilityEngine, RankedCandidate};
use crate::config::{EngineSettings, SegueConfig};
use crate::error::{AssemblyError, FeatureError};
use crate::features::normalize::normalize_energy;
use crate::features::{CacheStats, FeatureTables, FeatureVector, FeatureVectorEngine, VectorCache};
use crate::quality::{playlist_gate, DescriptorGate, PlaylistDraft};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use segue_common::TrackDescriptor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Multi-stage playlist builder
#[derive(Debug)]
pub struct PlaylistAssembler {
    vectors: FeatureVectorEngine,
    compatibility: CompatibilityEngine,
    descriptor_gate: DescriptorGate,
    settings: EngineSettings,
    events: Option<mpsc::Sender<AssemblyEvent>>,
}

impl PlaylistAssembler {
    pub fn new(vectors: FeatureVectorEngine, compatibility: CompatibilityEngine, settings: EngineSettings) -> Self {
        Self {
            vectors,
            compatibility,
            descriptor_gate: DescriptorGate::new(),
            settings,
            events: None,
        }
    }

    /// Send progress events to `event_tx`
    pub fn with_events(mut self, event_tx: mpsc::Sender<AssemblyEvent>) -> Self {
        self.events = Some(event_tx);
        self
    }

    /// Assembler with a fresh vector cache and the configured genre matrix
    ///
    /// # Errors
    /// `InvalidConfiguration` for zero-sized engine settings or a bad genre
    /// matrix override
    pub fn from_config(config: &SegueConfig) -> Result<Self, AssemblyError> {
        config.engine.validate()?;
        let genre_matrix = config
            .genre_matrix()
            .map_err(|e| AssemblyError::InvalidConfiguration(e.to_string()))?;

        let tables = FeatureTables::builtin();
        let compatibility = CompatibilityEngine::new(Arc::clone(&tables.weights), genre_matrix);
        let cache = Arc::new(VectorCache::new(config.engine.cache_capacity));
        let vectors = FeatureVectorEngine::new(tables).with_cache(cache);

        Ok(Self::new(vectors, compatibility, config.engine.clone()))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.vectors.cache().map(|cache| cache.stats())
    }

    /// Assemble from an in-memory candidate pool
    pub async fn assemble(
        &self,
        seed: &TrackDescriptor,
        candidates: Vec<TrackDescriptor>,
        config: &AssemblyConfig,
        cancel: &CancellationToken,
    ) -> Result<Playlist, AssemblyError> {
        self.assemble_from_source(seed, &candidates, config, cancel).await
    }

    /// Assemble a playlist for `seed`
    ///
    /// # Errors
    /// - `InvalidConfiguration`: unusable `config`
    /// - `SeedIncomplete`: seed has no usable tempo
    /// - `CandidateSource`: the source failed
    /// - `NoCompatibleCandidates`: filtering removed every candidate
    /// - `InvalidVector`: the seed vector is numerically invalid
    /// - `Cancelled`: `cancel` fired; no partial playlist is returned
    pub async fn assemble_from_source(
        &self,
        seed: &TrackDescriptor,
        source: &dyn CandidateSource,
        config: &AssemblyConfig,
        cancel: &CancellationToken,
    ) -> Result<Playlist, AssemblyError> {
        let playlist_id = Uuid::new_v4();
        let start_time = Instant::now();

        info!(
            playlist_id = %playlist_id,
            seed = %seed.id,
            length = config.length,
            tolerance = config.tempo_tolerance,
            curve = %config.energy_curve,
            "Starting playlist assembly"
        );

        // Stage 1: SEED VALIDATION
        self.enter_stage(playlist_id, cancel, AssemblyStage::SeedValidation)?;
        config.validate()?;
        self.settings.validate()?;
        let seed_bpm = seed.usable_tempo().ok_or_else(|| {
            warn!(playlist_id = %playlist_id, seed = %seed.id, "Seed rejected: no usable tempo");
            AssemblyError::SeedIncomplete {
                seed_id: seed.id.clone(),
            }
        })?;
        let seed_inspection = self.descriptor_gate.inspect(seed);

        // Stage 2: CANDIDATE COLLECTION
        self.enter_stage(playlist_id, cancel, AssemblyStage::CandidateCollection)?;
        let pool = self.collect_candidates(seed, source)?;
        let pool_size = pool.len();
        debug!(playlist_id = %playlist_id, pool_size, "Candidates collected");

        // Stage 3: FILTERING
        self.enter_stage(playlist_id, cancel, AssemblyStage::Filtering)?;
        let filtered = filter_candidates(
            seed_bpm,
            pool,
            config.tempo_tolerance,
            &self.descriptor_gate,
            config.min_descriptor_score,
        );
        info!(
            playlist_id = %playlist_id,
            examined = filtered.stats.examined,
            missing_tempo = filtered.stats.missing_tempo,
            out_of_tolerance = filtered.stats.out_of_tolerance,
            below_quality = filtered.stats.below_quality,
            kept = filtered.stats.kept,
            "Filtering complete"
        );
        if filtered.is_empty() {
            return Err(AssemblyError::NoCompatibleCandidates {
                pool_size,
                tolerance: config.tempo_tolerance,
            });
        }

        // Stage 4: COMPATIBILITY RANKING
        self.enter_stage(playlist_id, cancel, AssemblyStage::CompatibilityRanking)?;
        let seed_assessment = self.vectors.assess(&seed_inspection.sanitized)?;
        if !seed_assessment.passed() {
            return Err(FeatureError::invalid(format!(
                "seed '{}' vector failed the vector gate: {}",
                seed.id,
                seed_assessment.report.issues.join("; ")
            ))
            .into());
        }
        let scored = self.compute_vectors(playlist_id, filtered.kept, cancel).await?;
        let ranked = self.compatibility.rank_candidates(
            &seed_assessment.vector,
            scored,
            config.min_similarity,
            config.length,
        );
        debug!(playlist_id = %playlist_id, selected = ranked.len(), "Ranking complete");

        // Stage 5: ENERGY ORDERING
        self.enter_stage(playlist_id, cancel, AssemblyStage::EnergyOrdering)?;
        let seed_energy = energy_of(seed);
        let ordered = order_by_curve(ranked, config.energy_curve, seed_energy, |r: &RankedCandidate<FilteredCandidate>| {
            energy_of(&r.item.original)
        });

        // Stage 6: FINAL QUALITY CHECK
        self.enter_stage(playlist_id, cancel, AssemblyStage::FinalQualityCheck)?;
        let entries: Vec<PlaylistEntry> = ordered
            .into_iter()
            .map(|r| PlaylistEntry {
                descriptor: r.item.original,
                compatibility: r.score,
            })
            .collect();

        let draft = PlaylistDraft {
            seed: seed.clone(),
            tracks: entries.iter().map(|e| e.descriptor.clone()).collect(),
            tempo_tolerance: config.tempo_tolerance,
            genre_matrix: Arc::clone(self.compatibility.genre_matrix()),
        };
        let mut quality = playlist_gate(config.certification_threshold).run(&draft);
        if entries.len() < config.length {
            quality.mark_underfilled(entries.len(), config.length);
        }

        let summary = PlaylistSummary::from_tracks(entries.iter().map(|e| &e.descriptor));

        info!(
            playlist_id = %playlist_id,
            tracks = entries.len(),
            score = quality.score,
            level = %quality.level,
            passed = quality.passed,
            underfilled = quality.underfilled,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Playlist assembled"
        );
        if let Some(stats) = self.cache_stats() {
            debug!(
                entries = stats.entries,
                hits = stats.hits,
                misses = stats.misses,
                computations = stats.computations,
                "Vector cache statistics"
            );
        }

        Ok(Playlist {
            playlist_id,
            assembled_at: Utc::now(),
            seed: seed.clone(),
            energy_curve: config.energy_curve,
            requested_length: config.length,
            entries,
            summary,
            quality,
        })
    }

    /// Pull, de-duplicate and cap the candidate pool
    fn collect_candidates(
        &self,
        seed: &TrackDescriptor,
        source: &dyn CandidateSource,
    ) -> Result<Vec<TrackDescriptor>, AssemblyError> {
        let limit = self.settings.max_candidates;
        let mut pool = source.collect(seed, limit)?;

        let mut seen = HashSet::new();
        seen.insert(seed.id.clone());
        let before = pool.len();
        pool.retain(|candidate| seen.insert(candidate.id.clone()));
        if pool.len() < before {
            debug!(dropped = before - pool.len(), "Dropped seed and duplicate candidate ids");
        }

        if pool.len() > limit {
            warn!(collected = pool.len(), limit, "Candidate pool exceeds limit, truncating");
            pool.truncate(limit);
        }
        Ok(pool)
    }

    /// Feature vectors for every candidate, `batch_size` at a time
    ///
    /// Candidates whose vector fails to compute or fails the vector gate are
    /// logged and skipped.
    async fn compute_vectors(
        &self,
        playlist_id: Uuid,
        candidates: Vec<FilteredCandidate>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(FilteredCandidate, FeatureVector)>, AssemblyError> {
        let batch_size = self.settings.batch_size.max(1);
        let parallelism = self.settings.worker_parallelism.max(1);
        let total = candidates.len();
        let mut vectors = Vec::with_capacity(total);
        let mut remaining = candidates.into_iter().peekable();
        let mut batch_index = 0usize;

        while remaining.peek().is_some() {
            let batch: Vec<FilteredCandidate> = remaining.by_ref().take(batch_size).collect();

            let results: Vec<_> = stream::iter(batch.into_iter().map(|candidate| {
                let engine = self.vectors.clone();
                async move {
                    let descriptor = candidate.sanitized.clone();
                    let result = tokio::task::spawn_blocking(move || engine.assess(&descriptor)).await;
                    (candidate, result)
                }
            }))
            .buffered(parallelism)
            .collect()
            .await;

            for (candidate, result) in results {
                match result {
                    Ok(Ok(assessment)) if assessment.passed() => vectors.push((candidate, assessment.vector)),
                    Ok(Ok(assessment)) => {
                        warn!(
                            candidate = %candidate.original.id,
                            score = assessment.report.score,
                            "Skipping candidate: vector failed quality gate"
                        );
                    }
                    Ok(Err(e)) => {
                        warn!(candidate = %candidate.original.id, error = %e, "Skipping candidate: vector computation failed");
                    }
                    Err(e) => {
                        warn!(candidate = %candidate.original.id, error = %e, "Skipping candidate: vector task failed");
                    }
                }
            }

            batch_index += 1;
            debug!(batch = batch_index, computed = vectors.len(), "Vector batch complete");
            self.emit(AssemblyEvent::VectorBatchCompleted {
                playlist_id,
                batch: batch_index,
                computed: vectors.len(),
                total,
            });
            checkpoint(cancel, AssemblyStage::CompatibilityRanking)?;
        }

        Ok(vectors)
    }

    /// Cancellation check, then a `StageStarted` event
    fn enter_stage(&self, playlist_id: Uuid, cancel: &CancellationToken, stage: AssemblyStage) -> Result<(), AssemblyError> {
        checkpoint(cancel, stage)?;
        self.emit(AssemblyEvent::StageStarted { playlist_id, stage });
        Ok(())
    }

    fn emit(&self, event: AssemblyEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }
}

impl Default for PlaylistAssembler {
    fn default() -> Self {
        let cache = Arc::new(VectorCache::new(EngineSettings::default().cache_capacity));
        Self::new(
            FeatureVectorEngine::default().with_cache(cache),
            CompatibilityEngine::default(),
            EngineSettings::default(),
        )
    }
}

fn checkpoint(cancel: &CancellationToken, stage: AssemblyStage) -> Result<(), AssemblyError> {
    if cancel.is_cancelled() {
        info!(stage = %stage, "Assembly cancelled");
        return Err(AssemblyError::Cancelled { stage });
    }
    Ok(())
}

fn energy_of(descriptor: &TrackDescriptor) -> f64 {
    normalize_energy(descriptor.finite_energy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::EnergyCurve;

    fn track(id: &str, bpm: f64, energy: f64) -> TrackDescriptor {
        TrackDescriptor::new(id)
            .with_tempo(bpm)
            .with_key("8A")
            .with_energy(energy)
            .with_genre("house")
            .with_duration(300.0)
    }

    fn small_batches() -> PlaylistAssembler {
        let settings = EngineSettings {
            worker_parallelism: 2,
            batch_size: 2,
            ..Default::default()
        };
        PlaylistAssembler::new(
            FeatureVectorEngine::default().with_cache(Arc::new(VectorCache::new(64))),
            CompatibilityEngine::default(),
            settings,
        )
    }

    #[tokio::test]
    async fn test_seed_and_duplicates_are_dropped() {
        let assembler = small_batches();
        let seed = track("seed", 128.0, 0.6);
        let pool = vec![seed.clone(), track("a", 128.0, 0.6), track("a", 128.0, 0.6), track("b", 127.5, 0.55)];
        let config = AssemblyConfig {
            length: 10,
            ..Default::default()
        };

        let playlist = assembler
            .assemble(&seed, pool, &config, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(playlist.seed_id(), "seed");
        let mut ids = playlist.track_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_max_candidates_caps_pool() {
        let settings = EngineSettings {
            max_candidates: 3,
            ..Default::default()
        };
        let assembler = PlaylistAssembler::new(FeatureVectorEngine::default(), CompatibilityEngine::default(), settings);
        let seed = track("seed", 128.0, 0.6);
        let pool: Vec<_> = (0..10).map(|i| track(&format!("t{}", i), 128.0, 0.6)).collect();

        let playlist = assembler
            .assemble(&seed, pool, &AssemblyConfig::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(playlist.len(), 3);
    }

    #[tokio::test]
    async fn test_batches_populate_cache() {
        let assembler = small_batches();
        let seed = track("seed", 128.0, 0.65);
        let pool: Vec<_> = (0..5).map(|i| track(&format!("t{}", i), 127.0 + i as f64 * 0.5, 0.6)).collect();

        assembler
            .assemble(&seed, pool, &AssemblyConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        let stats = assembler.cache_stats().unwrap();
        assert_eq!(stats.entries, 6);
        assert_eq!(stats.computations, 6);
    }

    #[tokio::test]
    async fn test_summary_and_entries() {
        let assembler = small_batches();
        let seed = track("seed", 128.0, 0.5);
        let pool = vec![track("low", 128.0, 0.4), track("high", 128.0, 0.6)];
        let config = AssemblyConfig {
            length: 2,
            energy_curve: EnergyCurve::Ascending,
            ..Default::default()
        };

        let playlist = assembler
            .assemble(&seed, pool, &config, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(playlist.track_ids(), vec!["low", "high"]);
        assert_eq!(playlist.seed.id, "seed");
        assert!(playlist.entries.iter().all(|e| e.compatibility.overall >= config.min_similarity));
        assert!(!playlist.is_underfilled());
        assert_eq!(playlist.summary.track_count, 2);
        assert!((playlist.summary.total_duration_secs - 600.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_events_follow_stages_and_batches() {
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let assembler = small_batches().with_events(event_tx);
        let seed = track("seed", 128.0, 0.6);
        let pool: Vec<_> = (0..5).map(|i| track(&format!("t{}", i), 128.0, 0.5 + i as f64 * 0.02)).collect();

        let playlist = assembler
            .assemble(&seed, pool, &AssemblyConfig::default(), &CancellationToken::new())
            .await
            .unwrap();
        drop(assembler);

        let mut stages = Vec::new();
        let mut batches = Vec::new();
        while let Some(event) = event_rx.recv().await {
            match event {
                AssemblyEvent::StageStarted { playlist_id, stage } => {
                    assert_eq!(playlist_id, playlist.playlist_id);
                    stages.push(stage);
                }
                AssemblyEvent::VectorBatchCompleted { batch, total, .. } => {
                    assert_eq!(total, 5);
                    batches.push(batch);
                }
            }
        }

        assert_eq!(
            stages,
            vec![
                AssemblyStage::SeedValidation,
                AssemblyStage::CandidateCollection,
                AssemblyStage::Filtering,
                AssemblyStage::CompatibilityRanking,
                AssemblyStage::EnergyOrdering,
                AssemblyStage::FinalQualityCheck,
            ]
        );
        // batch_size 2 over 5 candidates
        assert_eq!(batches, vec![1, 2, 3]);
    }
}
