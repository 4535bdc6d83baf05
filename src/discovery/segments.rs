//! Behavioral user segmentation
//!
//! Users are described by a feature vector, clustered on four standardized
//! features, and each cluster is named by comparing its means against the
//! quantiles of the whole population. Clusters that earn the same name are
//! merged into one segment. When clustering yields no strugglers or quick
//! bookers, those two segments are cut directly from the population.

use crate::config::ClusteringConfig;
use crate::discovery::clustering::{standardize, Clusterer, Dbscan, NOISE};
use crate::discovery::types::{
    Segment, SegmentCharacteristics, SegmentMethod, UserFeatureVector, UserSegments,
};
use crate::profiler::ApplicationView;
use crate::stats::{mean, quantile, FeatureSummary};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

pub const STRUGGLERS: &str = "strugglers";
pub const QUICK_BOOKERS: &str = "quick_bookers";
pub const EXPLORERS: &str = "explorers";
pub const OTHERS: &str = "others";

const STRUGGLERS_DESCRIPTION: &str =
    "Users facing friction - high repetition and stuck patterns";
const QUICK_BOOKERS_DESCRIPTION: &str = "Users who know what they want and book quickly";
const EXPLORERS_DESCRIPTION: &str = "Users who browse extensively before deciding";
const OTHERS_DESCRIPTION: &str = "Outliers with unique behavior patterns";
const CLUSTER_DESCRIPTION: &str = "Users with distinct behavior patterns";

/// Population cut points used to name clusters
#[derive(Debug, Clone, Copy, PartialEq)]
struct PopulationThresholds {
    repetition_p75: f64,
    events_p33: f64,
    events_p67: f64,
    diversity_median: f64,
}

impl PopulationThresholds {
    fn from_features(features: &[UserFeatureVector]) -> Self {
        let events: Vec<f64> = features.iter().map(|f| f.total_events as f64).collect();
        let diversity: Vec<f64> = features.iter().map(|f| f.diversity).collect();
        let repetition: Vec<f64> = features.iter().map(|f| f.repetition_ratio).collect();
        Self {
            repetition_p75: quantile(&repetition, 0.75).unwrap_or(0.0),
            events_p33: quantile(&events, 0.33).unwrap_or(0.0),
            events_p67: quantile(&events, 0.67).unwrap_or(0.0),
            diversity_median: quantile(&diversity, 0.5).unwrap_or(0.0),
        }
    }

    fn is_struggler(&self, c: &SegmentCharacteristics) -> bool {
        c.avg_repetition > self.repetition_p75
    }

    fn is_quick_booker(&self, c: &SegmentCharacteristics) -> bool {
        c.avg_events < self.events_p33 && c.avg_diversity > self.diversity_median
    }

    fn is_explorer(&self, c: &SegmentCharacteristics) -> bool {
        c.avg_events > self.events_p67 && c.avg_diversity > self.diversity_median
    }

    /// Business label and description for one cluster
    fn label(&self, cluster_id: i64, c: &SegmentCharacteristics) -> (String, &'static str) {
        if cluster_id == NOISE {
            (OTHERS.to_string(), OTHERS_DESCRIPTION)
        } else if self.is_struggler(c) {
            (STRUGGLERS.to_string(), STRUGGLERS_DESCRIPTION)
        } else if self.is_quick_booker(c) {
            (QUICK_BOOKERS.to_string(), QUICK_BOOKERS_DESCRIPTION)
        } else if self.is_explorer(c) {
            (EXPLORERS.to_string(), EXPLORERS_DESCRIPTION)
        } else {
            (format!("cluster_{cluster_id}"), CLUSTER_DESCRIPTION)
        }
    }
}

/// Clusters sharing one label
struct LabeledGroup<'f> {
    label: String,
    description: &'static str,
    cluster_ids: Vec<i64>,
    users: Vec<&'f UserFeatureVector>,
}

/// Clusters users into named segments
#[derive(Debug, Clone)]
pub struct BehavioralSegmenter<C: Clusterer = Dbscan> {
    clusterer: C,
}

impl BehavioralSegmenter<Dbscan> {
    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::with_clusterer(Dbscan::from_config(config))
    }
}

impl<C: Clusterer> BehavioralSegmenter<C> {
    pub fn with_clusterer(clusterer: C) -> Self {
        Self { clusterer }
    }

    /// Build one feature vector per user, in user id order
    pub fn user_features(view: &ApplicationView) -> Vec<UserFeatureVector> {
        view.users()
            .iter()
            .filter_map(|(&user_id, indices)| {
                let (&first, &last) = (indices.first()?, indices.last()?);
                let total = indices.len();

                let names: Vec<&str> = indices.iter().map(|&i| view.name(i)).collect();
                let unique: HashSet<&str> = names.iter().copied().collect();
                let repeats = names.windows(2).filter(|w| w[0] == w[1]).count();
                let sessions: HashSet<u32> =
                    indices.iter().map(|&i| view.log().session_id(i)).collect();

                let span = view.event(last).timestamp - view.event(first).timestamp;

                Some(UserFeatureVector {
                    user_id: user_id.to_string(),
                    total_events: total,
                    unique_event_count: unique.len(),
                    diversity: unique.len() as f64 / total as f64,
                    repetition_ratio: repeats as f64 / total as f64,
                    time_span_hours: span.num_milliseconds() as f64 / 3_600_000.0,
                    session_count: sessions.len(),
                    avg_session_length: total as f64 / sessions.len() as f64,
                })
            })
            .collect()
    }

    pub fn segment(&self, view: &ApplicationView) -> UserSegments {
        self.segment_features(&Self::user_features(view))
    }

    /// Cluster, label, and fill in missing business segments
    pub fn segment_features(&self, features: &[UserFeatureVector]) -> UserSegments {
        if features.is_empty() {
            return UserSegments::default();
        }

        let rows: Vec<Vec<f64>> = features
            .iter()
            .map(|f| f.clustering_features().to_vec())
            .collect();
        let labels = self.clusterer.fit_predict(&standardize(&rows));

        let mut members: BTreeMap<i64, Vec<&UserFeatureVector>> = BTreeMap::new();
        for (feature, &label) in features.iter().zip(&labels) {
            members.entry(label).or_default().push(feature);
        }

        let thresholds = PopulationThresholds::from_features(features);
        debug!("Segment thresholds: {thresholds:?}");

        let total_users = features.len();
        let mut groups: Vec<LabeledGroup> = Vec::new();
        for (&cluster_id, users) in &members {
            let (label, description) = thresholds.label(cluster_id, &characteristics(users));
            match groups.iter().position(|g| g.label == label) {
                Some(i) => {
                    debug!("Merging cluster {cluster_id} into segment {label}");
                    let group = &mut groups[i];
                    group.cluster_ids.push(cluster_id);
                    group.users.extend(users.iter().copied());
                }
                None => groups.push(LabeledGroup {
                    label,
                    description,
                    cluster_ids: vec![cluster_id],
                    users: users.clone(),
                }),
            }
        }

        let mut segments: Vec<Segment> = groups
            .into_iter()
            .map(|group| Segment {
                count: group.users.len(),
                percentage: group.users.len() as f64 / total_users as f64 * 100.0,
                characteristics: characteristics(&group.users),
                description: group.description.to_string(),
                label: group.label,
                cluster_ids: group.cluster_ids,
                method: SegmentMethod::DensityCluster,
            })
            .collect();

        let has = |segments: &[Segment], label: &str| segments.iter().any(|s| s.label == label);

        if !has(&segments, STRUGGLERS) {
            let strugglers: Vec<&UserFeatureVector> = features
                .iter()
                .filter(|f| f.repetition_ratio > thresholds.repetition_p75)
                .collect();
            if !strugglers.is_empty() {
                warn!(
                    "No struggler cluster found; thresholding {} users directly",
                    strugglers.len()
                );
                segments.push(fallback_segment(
                    STRUGGLERS,
                    STRUGGLERS_DESCRIPTION,
                    &strugglers,
                    total_users,
                ));
            }
        }

        if !has(&segments, QUICK_BOOKERS) {
            let quick: Vec<&UserFeatureVector> = features
                .iter()
                .filter(|f| {
                    (f.total_events as f64) < thresholds.events_p33
                        && f.diversity > thresholds.diversity_median
                })
                .collect();
            if !quick.is_empty() {
                warn!(
                    "No quick-booker cluster found; thresholding {} users directly",
                    quick.len()
                );
                segments.push(fallback_segment(
                    QUICK_BOOKERS,
                    QUICK_BOOKERS_DESCRIPTION,
                    &quick,
                    total_users,
                ));
            }
        }

        let noise_users = members.get(&NOISE).map_or(0, Vec::len);
        UserSegments {
            total_users,
            clusters_found: members.keys().filter(|&&id| id != NOISE).count(),
            noise_users,
            segments,
            feature_summary: feature_summary(features),
        }
    }
}

fn characteristics(users: &[&UserFeatureVector]) -> SegmentCharacteristics {
    let events: Vec<f64> = users.iter().map(|f| f.total_events as f64).collect();
    let diversity: Vec<f64> = users.iter().map(|f| f.diversity).collect();
    let repetition: Vec<f64> = users.iter().map(|f| f.repetition_ratio).collect();
    SegmentCharacteristics {
        avg_events: mean(&events).unwrap_or(0.0),
        avg_diversity: mean(&diversity).unwrap_or(0.0),
        avg_repetition: mean(&repetition).unwrap_or(0.0),
    }
}

fn fallback_segment(
    label: &str,
    description: &str,
    users: &[&UserFeatureVector],
    total_users: usize,
) -> Segment {
    Segment {
        label: label.to_string(),
        count: users.len(),
        percentage: users.len() as f64 / total_users as f64 * 100.0,
        characteristics: characteristics(users),
        description: description.to_string(),
        cluster_ids: Vec::new(),
        method: SegmentMethod::ThresholdFallback,
    }
}

fn feature_summary(features: &[UserFeatureVector]) -> BTreeMap<String, FeatureSummary> {
    let columns: [(&str, fn(&UserFeatureVector) -> f64); 7] = [
        ("total_events", |f| f.total_events as f64),
        ("unique_events", |f| f.unique_event_count as f64),
        ("diversity", |f| f.diversity),
        ("repetition_ratio", |f| f.repetition_ratio),
        ("time_span_hours", |f| f.time_span_hours),
        ("session_count", |f| f.session_count as f64),
        ("avg_session_length", |f| f.avg_session_length),
    ];
    columns
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = features.iter().map(extract).collect();
            (name.to_string(), FeatureSummary::from_values(&values))
        })
        .collect()
}
