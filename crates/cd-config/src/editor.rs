//! Hand-off of a saved configuration to an external editor.

use std::path::Path;

use cd_core::Result;

/// Something that lets a user edit a saved configuration file.
///
/// [`ConfigDict::edit`](crate::ConfigDict::edit) saves the configuration,
/// calls [`open`](Self::open) with the storage path, blocks in
/// [`wait`](Self::wait) until the user is done, then reloads the file.
/// Implementations report failures as [`cd_core::Error::Editor`].
pub trait ExternalEditor {
    /// Start editing `path`.
    fn open(&self, path: &Path) -> Result<()>;

    /// Block until editing of `path` has finished.
    fn wait(&self, path: &Path) -> Result<()>;
}
