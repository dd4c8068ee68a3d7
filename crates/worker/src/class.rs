/// Kind of background work, carried on every worker trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Parsing resource files into items.
	Scan,
	/// Reading or writing persistent cache files.
	CacheIo,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Scan => "scan",
			Self::CacheIo => "cache_io",
		}
	}
}
