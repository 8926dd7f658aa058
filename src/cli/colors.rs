use std::fmt::Display;
use yansi::Paint;

pub(crate) fn color_error<T: Display>(value: T) -> Paint<T> { Paint::red(value).bold() }

/// Follow-up advice printed beneath an error.
pub(crate) fn color_hint<T: Display>(value: T) -> Paint<T> { Paint::yellow(value).dimmed() }

pub(crate) fn color_done<T: Display>(value: T) -> Paint<T> { Paint::green(value).bold() }

/// Versions, devices, and paths named in a status line.
pub(crate) fn color_subject<T: Display>(value: T) -> Paint<T> { Paint::cyan(value).bold() }
