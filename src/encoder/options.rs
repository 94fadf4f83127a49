//! Encoder options (§6 public API surface).

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub delimiter: char,
    pub include_types: bool,
    pub version_string: String,
    pub indent: usize,
    pub single_line_primitive_lists: bool,
    pub pretty_delimiters: bool,
    pub compact_tables: bool,
    pub schema_first: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_types: false,
            version_string: "1.0".to_string(),
            indent: 2,
            single_line_primitive_lists: true,
            pretty_delimiters: false,
            compact_tables: false,
            schema_first: false,
        }
    }
}
