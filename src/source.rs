use crate::error::SourceError;
use crate::model::Bookmark;
use async_trait::async_trait;
use std::fmt;

/// A named partition of the user's bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Unread,
}

impl Folder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Unread => "unread",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote service that owns the bookmarks.
#[async_trait]
pub trait BookmarkSource: Send + Sync {
    /// Returns up to `limit` bookmarks from `folder`, in the service's order.
    async fn list_bookmarks(&self, folder: Folder, limit: u32) -> Result<Vec<Bookmark>, SourceError>;

    /// Marks the bookmark as read.
    async fn archive(&self, bookmark: &Bookmark) -> Result<(), SourceError>;
}
