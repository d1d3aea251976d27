use crate::model::FeatureType;

/// Platform name → CF feature type, as the wizard offers them.
pub const PLATFORMS: &[(&str, FeatureType)] = &[
    ("buoy", FeatureType::TimeSeries),
    ("mooring", FeatureType::TimeSeries),
    ("fixed station", FeatureType::TimeSeries),
    ("tide gauge", FeatureType::TimeSeries),
    ("weather station", FeatureType::TimeSeries),
    ("ship", FeatureType::Trajectory),
    ("glider", FeatureType::Trajectory),
    ("drifter", FeatureType::Trajectory),
    ("aircraft", FeatureType::Trajectory),
    ("auv", FeatureType::Trajectory),
    ("ctd", FeatureType::Profile),
    ("profiler", FeatureType::Profile),
    ("radiosonde", FeatureType::Profile),
];

pub fn feature_type_for(platform: &str) -> Option<FeatureType> {
    let key = platform.trim().to_ascii_lowercase();
    PLATFORMS.iter().find(|(name, _)| *name == key).map(|(_, t)| *t)
}
