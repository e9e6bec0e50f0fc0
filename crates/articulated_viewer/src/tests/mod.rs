//! Cross-module scenarios on the sample arm

pub(crate) mod fixtures;
