//! Service URL classification
//!
//! Pure string logic, no network access. Recognizes ArcGIS REST service URLs
//! ending in `/MapServer`, `/FeatureServer` or `/ImageServer`, optionally
//! followed by `/<digits>`.

/// Service type path segments, matched case-insensitively
const SERVICE_TYPES: [&str; 3] = ["MapServer", "FeatureServer", "ImageServer"];

/// Classified service URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceUrl {
    /// Whole service, not pinned to a sublayer
    Root { base: String },
    /// One specific sublayer of a service
    Sublayer { base: String, layer_id: i64 },
    /// Anything else; passed through untouched
    Unrecognized { url: String },
}

impl ServiceUrl {
    pub fn is_root(&self) -> bool {
        matches!(self, ServiceUrl::Root { .. })
    }

    /// Service base URL (the normalized input when unrecognized)
    pub fn base_service_url(&self) -> &str {
        match self {
            ServiceUrl::Root { base } | ServiceUrl::Sublayer { base, .. } => base,
            ServiceUrl::Unrecognized { url } => url,
        }
    }

    pub fn layer_id(&self) -> Option<i64> {
        match self {
            ServiceUrl::Sublayer { layer_id, .. } => Some(*layer_id),
            _ => None,
        }
    }
}

/// Classify a service URL after trimming whitespace and trailing slashes
pub fn classify(url: &str) -> ServiceUrl {
    let normalized = url.trim().trim_end_matches('/');
    let unrecognized = || ServiceUrl::Unrecognized {
        url: normalized.to_string(),
    };

    let Some((prefix, last)) = normalized.rsplit_once('/') else {
        return unrecognized();
    };

    if is_service_type(last) && !prefix.is_empty() {
        return ServiceUrl::Root {
            base: normalized.to_string(),
        };
    }

    if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
        if let Some((service_prefix, service_type)) = prefix.rsplit_once('/') {
            if is_service_type(service_type) && !service_prefix.is_empty() {
                if let Ok(layer_id) = last.parse::<i64>() {
                    return ServiceUrl::Sublayer {
                        base: prefix.to_string(),
                        layer_id,
                    };
                }
            }
        }
    }

    unrecognized()
}

fn is_service_type(segment: &str) -> bool {
    SERVICE_TYPES
        .iter()
        .any(|service_type| service_type.eq_ignore_ascii_case(segment))
}
