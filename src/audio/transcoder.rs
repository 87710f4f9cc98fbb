//! Transcoding stage: one encoder run per planned segment.

use super::{EncodingProfile, SegmentEncoder};
use crate::error::Result;
use crate::identifier::Identifier;
use crate::planner::SegmentPlan;
use crate::source::RawMediaAsset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of encoding one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SegmentOutcome {
    Encoded,
    Failed { reason: String },
}

/// One encoded (or failed) part of the source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// Zero-based index matching the plan.
    pub index: usize,
    pub file_path: PathBuf,
    pub outcome: SegmentOutcome,
}

impl AudioSegment {
    pub fn is_encoded(&self) -> bool {
        self.outcome == SegmentOutcome::Encoded
    }
}

/// Encodes every planned segment of a raw asset into its own MP3.
pub struct Transcoder {
    encoder: Arc<dyn SegmentEncoder>,
    profile: EncodingProfile,
}

impl Transcoder {
    pub fn new(encoder: Arc<dyn SegmentEncoder>, profile: EncodingProfile) -> Self {
        Self { encoder, profile }
    }

    pub fn profile(&self) -> &EncodingProfile {
        &self.profile
    }

    /// Encode all segments of `plan` into `{workspace}/{id}/{id}_{n}.mp3`.
    ///
    /// A failing segment is recorded as [`SegmentOutcome::Failed`] and the
    /// remaining segments are still attempted. The raw asset is removed
    /// afterwards whatever the outcome.
    #[instrument(skip_all, fields(identifier = %identifier, segments = plan.len()))]
    pub async fn encode(
        &self,
        asset: RawMediaAsset,
        identifier: &Identifier,
        plan: &SegmentPlan,
        workspace: &Path,
    ) -> Result<Vec<AudioSegment>> {
        let result = self.encode_all(&asset, identifier, plan, workspace).await;
        asset.discard();
        result
    }

    async fn encode_all(
        &self,
        asset: &RawMediaAsset,
        identifier: &Identifier,
        plan: &SegmentPlan,
        workspace: &Path,
    ) -> Result<Vec<AudioSegment>> {
        let folder = workspace.join(identifier.as_str());
        let mut folder_ready = false;
        let mut segments = Vec::with_capacity(plan.len());

        for spec in plan {
            if !folder_ready {
                tokio::fs::create_dir_all(&folder).await?;
                folder_ready = true;
            }

            let file_path = folder.join(identifier.segment_file_name(spec.index));
            let outcome = match self
                .encoder
                .encode_segment(&asset.local_path, spec, &self.profile, &file_path)
                .await
            {
                Ok(()) => SegmentOutcome::Encoded,
                Err(e) => {
                    warn!("Segment {} failed to encode: {}", spec.index + 1, e);
                    SegmentOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            segments.push(AudioSegment {
                index: spec.index,
                file_path,
                outcome,
            });
        }

        let encoded = segments.iter().filter(|s| s.is_encoded()).count();
        info!("Encoded {}/{} segments", encoded, segments.len());
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::sanitize;
    use crate::planner::plan;
    use crate::testing::ScriptedEncoder;

    fn raw_asset(dir: &Path) -> RawMediaAsset {
        let path = dir.join("My_Song.m4a");
        std::fs::write(&path, b"raw").unwrap();
        RawMediaAsset {
            local_path: path,
            duration_seconds: 3600.0,
            container: "m4a".to_string(),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let asset = raw_asset(dir.path());
        let raw_path = asset.local_path.clone();
        let encoder = Arc::new(ScriptedEncoder::failing_on(&[1]));
        let transcoder = Transcoder::new(encoder.clone(), EncodingProfile::default());
        let id = sanitize("My Song");

        let plan = plan(3600.0, 1800).unwrap();
        let segments = transcoder.encode(asset, &id, &plan, dir.path()).await.unwrap();

        assert_eq!(segments.len(), 3);
        assert!(segments[0].is_encoded());
        assert!(matches!(segments[1].outcome, SegmentOutcome::Failed { .. }));
        assert!(segments[2].is_encoded());
        assert_eq!(encoder.calls(), 3);

        assert_eq!(
            segments[2].file_path,
            dir.path().join("My_Song").join("My_Song_3.mp3")
        );
        assert!(segments[0].file_path.exists());
        assert!(!raw_path.exists(), "raw asset should be removed");
    }

    #[tokio::test]
    async fn test_raw_asset_removed_when_everything_fails() {
        let dir = tempfile::tempdir().unwrap();
        let asset = raw_asset(dir.path());
        let raw_path = asset.local_path.clone();
        let transcoder = Transcoder::new(
            Arc::new(ScriptedEncoder::failing_on(&[0, 1])),
            EncodingProfile::default(),
        );

        let plan = plan(1800.0, 1800).unwrap();
        let segments = transcoder
            .encode(asset, &sanitize("My Song"), &plan, dir.path())
            .await
            .unwrap();

        assert!(segments.iter().all(|s| !s.is_encoded()));
        assert!(!raw_path.exists());
    }

    #[tokio::test]
    async fn test_profile_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(ScriptedEncoder::failing_on(&[]));
        let transcoder = Transcoder::new(encoder.clone(), EncodingProfile::default());

        let plan = plan(100.0, 1800).unwrap();
        transcoder
            .encode(raw_asset(dir.path()), &sanitize("My Song"), &plan, dir.path())
            .await
            .unwrap();

        assert_eq!(encoder.profiles(), vec![EncodingProfile::default()]);
    }
}
