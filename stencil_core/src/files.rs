use std::path::Path;
use std::path::PathBuf;

/// Return `path` if nothing exists there yet, otherwise the first free
/// sibling named `<stem>-<n>.<ext>` counting up from 1.
///
/// The check is not atomic: another writer can take the returned path before
/// the caller creates it.
pub fn safe_file_name(path: impl AsRef<Path>) -> PathBuf {
	let path = path.as_ref();
	if !path.exists() {
		return path.to_path_buf();
	}

	let stem = path
		.file_stem()
		.map(|stem| stem.to_string_lossy().to_string())
		.unwrap_or_default();
	let extension = path
		.extension()
		.map(|extension| extension.to_string_lossy().to_string());

	(1_u64..)
		.map(|counter| {
			let file_name = match &extension {
				Some(extension) => format!("{stem}-{counter}.{extension}"),
				None => format!("{stem}-{counter}"),
			};
			path.with_file_name(file_name)
		})
		.find(|candidate| !candidate.exists())
		.unwrap_or_else(|| path.to_path_buf())
}
