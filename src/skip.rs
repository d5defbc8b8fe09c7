use std::fmt;

/// Reasons a post-build step did nothing. These are not failures and are
/// reported to the operator as status lines.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Neither the opt-in flag nor a release environment name
    NotEligible {
        environment_name: String,
        release_suffix: String,
    },
    /// `GIT_TAG_ON_RELEASE` is not enabled
    TaggingDisabled,
    /// The publish step did not succeed, so nothing is tagged
    PublishFailed,
    /// Dry run: the step was only described
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotEligible {
                environment_name,
                release_suffix,
            } => write!(
                f,
                "Environment '{}' is not a release build (no FTP_AUTO_PUBLISH=1, no '{}' suffix)",
                environment_name, release_suffix
            ),
            SkipReason::TaggingDisabled => {
                write!(f, "Tagging not requested (GIT_TAG_ON_RELEASE != 1)")
            }
            SkipReason::PublishFailed => write!(f, "Publish did not succeed; not tagging"),
            SkipReason::DryRun => write!(f, "Dry run; nothing executed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_eligible_display() {
        let reason = SkipReason::NotEligible {
            environment_name: "esp01_1m".to_string(),
            release_suffix: "_release".to_string(),
        };
        let msg = reason.to_string();
        assert!(msg.contains("esp01_1m"));
        assert!(msg.contains("_release"));
    }

    #[test]
    fn test_tagging_disabled_names_key() {
        assert!(SkipReason::TaggingDisabled
            .to_string()
            .contains("GIT_TAG_ON_RELEASE"));
    }
}
