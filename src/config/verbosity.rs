use crate::record::Level;

/// The three verbosity switches a process accepts (`--trace`, `-v`, `-q`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerbosityFlags {
    pub trace: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl VerbosityFlags {
    /// Flag/level pairs in priority order. First set flag wins.
    fn table(&self) -> [(bool, Level); 3] {
        [
            (self.trace, Level::ALL),
            (self.verbose, Level::DEBUG),
            (self.quiet, Level::WARNING),
        ]
    }

    /// Threshold selected by the flags, if any flag is set.
    pub fn selected(&self) -> Option<Level> {
        self.table()
            .into_iter()
            .find_map(|(set, level)| set.then_some(level))
    }

    pub fn threshold(&self) -> Level {
        self.selected().unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(trace: bool, verbose: bool, quiet: bool) -> VerbosityFlags {
        VerbosityFlags {
            trace,
            verbose,
            quiet,
        }
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(VerbosityFlags::default().threshold(), Level::INFO);
        assert_eq!(VerbosityFlags::default().selected(), None);
    }

    #[test]
    fn test_single_flags() {
        assert_eq!(flags(true, false, false).threshold(), Level(1));
        assert_eq!(flags(false, true, false).threshold(), Level::DEBUG);
        assert_eq!(flags(false, false, true).threshold(), Level::WARNING);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(flags(true, true, true).threshold(), Level(1));
        assert_eq!(flags(false, true, true).threshold(), Level::DEBUG);
    }
}
