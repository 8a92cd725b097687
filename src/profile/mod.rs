//! Support profiling and profile-matrix construction.

mod builder;
mod support;

pub use builder::{build_profile, summarize_profile, Normalization, ProfileSummary};
pub use support::{
    count_support, filter_by_support, filter_by_support_with_stats, Axis, SupportFilterResult,
};
