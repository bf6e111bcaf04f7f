//! Parser configuration.
//!
//! `ParseOptions::default()` gives the documented behaviour; the other
//! settings exist for hosts that still read data stored in older layouts.

/// How the per-row keys of a repeat in the flat dict are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatKeys {
    /// Path below the repeat: `kids_age` for `kids/kids_details/kids_age`.
    #[default]
    Relative,
    /// Root-relative path: `kids/kids_details/kids_age`.
    Absolute,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub repeat_keys: RepeatKeys,
    /// Ignore attributes declared on `<entity>` elements when collecting the
    /// submission attributes. ODK entity blocks carry their own `id` and
    /// `dataset` attributes.
    pub skip_entity_attributes: bool,
}

impl ParseOptions {
    pub fn with_repeat_keys(mut self, repeat_keys: RepeatKeys) -> Self {
        self.repeat_keys = repeat_keys;
        self
    }

    pub fn with_skip_entity_attributes(mut self, skip: bool) -> Self {
        self.skip_entity_attributes = skip;
        self
    }
}
