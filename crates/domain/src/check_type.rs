use serde::{Deserialize, Serialize};

use crate::website::FeatureFlags;

/// The closed set of check types an operator (or the scheduler) can
/// request. Replaces the string-keyed template lookups in the system this
/// was modeled on with a pure function over this enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Crawl,
    Visual,
    Blur,
    Performance,
    Full,
    Baseline,
}

impl CheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckType::Crawl => "crawl",
            CheckType::Visual => "visual",
            CheckType::Blur => "blur",
            CheckType::Performance => "performance",
            CheckType::Full => "full",
            CheckType::Baseline => "baseline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "crawl" => CheckType::Crawl,
            "visual" => CheckType::Visual,
            "blur" => CheckType::Blur,
            "performance" => CheckType::Performance,
            "full" => CheckType::Full,
            "baseline" => CheckType::Baseline,
            _ => return None,
        })
    }

    /// The per-check-type template: which phases a request of this type
    /// asks for, before ANDing against the website's own feature flags.
    fn template(self) -> (bool, bool, bool, bool) {
        // (crawl, visual, blur, performance)
        match self {
            CheckType::Crawl => (true, false, false, false),
            CheckType::Visual => (false, true, false, false),
            CheckType::Blur => (true, false, true, false),
            CheckType::Performance => (false, false, false, true),
            CheckType::Full => (true, true, true, true),
            CheckType::Baseline => (false, true, false, false),
        }
    }
}

/// The resolved set of phases to run for one Dispatcher invocation, plus the
/// baseline-create intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CheckConfig {
    pub crawl: bool,
    pub visual: bool,
    pub blur: bool,
    pub performance: bool,
    pub create_baseline: bool,
}

impl CheckConfig {
    /// Derive a manual check's config: template AND site flags, with the
    /// `baseline` check type always forcing `visual` + baseline-create
    /// intent regardless of the site's `visual_enabled` flag (an operator
    /// explicitly asking to create baselines is not gated by the flag that
    /// governs *automatic* visual checks).
    pub fn for_manual(check_type: CheckType, flags: FeatureFlags, has_baselines: bool) -> Self {
        let (crawl, visual, blur, performance) = check_type.template();
        let mut config = CheckConfig {
            crawl: crawl && flags.crawl_enabled,
            visual: visual && flags.visual_enabled,
            blur: blur && flags.blur_enabled,
            performance: performance && flags.performance_enabled,
            create_baseline: false,
        };

        if check_type == CheckType::Baseline {
            config.visual = true;
            config.create_baseline = true;
        } else if check_type == CheckType::Full && !has_baselines {
            config.create_baseline = true;
        }

        config
    }

    /// Derive a scheduled (automated) check's config: all four phases when
    /// `full_check_enabled`, else the site's per-feature flags verbatim.
    pub fn for_automated(flags: FeatureFlags) -> Self {
        if flags.full_check_enabled {
            CheckConfig {
                crawl: true,
                visual: true,
                blur: true,
                performance: true,
                create_baseline: false,
            }
        } else {
            CheckConfig {
                crawl: flags.crawl_enabled,
                visual: flags.visual_enabled,
                blur: flags.blur_enabled,
                performance: flags.performance_enabled,
                create_baseline: false,
            }
        }
    }

    /// Number of analysis phases this config asks for.
    pub fn phase_count(&self) -> usize {
        [self.crawl, self.visual, self.blur, self.performance]
            .iter()
            .filter(|p| **p)
            .count()
    }
}
