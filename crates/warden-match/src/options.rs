//! Options controlling how patterns are compared

/// Independent flags for [`MatchPattern::matches_url`] and
/// [`MatchPattern::matches_pattern`].
///
/// [`MatchPattern::matches_url`]: crate::MatchPattern::matches_url
/// [`MatchPattern::matches_pattern`]: crate::MatchPattern::matches_pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MatchOptions {
    /// Skip the scheme comparison
    pub ignore_schemes: bool,
    /// Skip the path comparison
    pub ignore_paths: bool,
    /// Succeed when either pattern contains the other
    pub match_bidirectionally: bool,
}

impl MatchOptions {
    pub const NONE: MatchOptions = MatchOptions {
        ignore_schemes: false,
        ignore_paths: false,
        match_bidirectionally: false,
    };

    pub fn ignoring_schemes(mut self) -> Self {
        self.ignore_schemes = true;
        self
    }

    pub fn ignoring_paths(mut self) -> Self {
        self.ignore_paths = true;
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.match_bidirectionally = true;
        self
    }

    pub(crate) fn one_way(mut self) -> Self {
        self.match_bidirectionally = false;
        self
    }
}
