// Static font metrics used to estimate how much vertical space wrapped canvas
// text needs. No font files are loaded at runtime.

pub mod font_metrics;
