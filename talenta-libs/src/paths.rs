use core::fmt;

/// Document collections of the backing store
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Bookings,
    ExpertAvailability,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Bookings => "bookings",
            Collection::ExpertAvailability => "expertAvailability",
        }
    }

    /// `<collection>/<id>`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::paths::Collection;
    ///
    /// assert_eq!(
    ///     Collection::ExpertAvailability.document("u42"),
    ///     "expertAvailability/u42"
    /// );
    /// ```
    pub fn document(self, id: &str) -> String {
        format!("{}/{}", self.name(), id)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Blob storage locations for user uploads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlobPath {
    Photo { uid: String, file_id: String },
    Video { uid: String, file_id: String },
    Certificate { uid: String, name: String },
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobPath::Photo { uid, file_id } => write!(f, "photos/{}/{}", uid, file_id),
            BlobPath::Video { uid, file_id } => write!(f, "videos/{}/{}", uid, file_id),
            BlobPath::Certificate { uid, name } => write!(f, "certificates/{}/{}", uid, name),
        }
    }
}
