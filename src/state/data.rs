/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer and the scan/registration flows.

/// A department a volunteer serves in
#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    /// Unique database ID
    pub id: i64,
    /// Display name (e.g., "Musik")
    pub name: String,
}

/// A volunteer resolved by code, joined with their department.
///
/// The join is flattened into this single shape at the store boundary;
/// nothing downstream ever sees the raw row layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVolunteer {
    /// Unique database ID
    pub id: i64,
    /// Display name (e.g., "Budi Santoso")
    pub name: String,
    /// Name of the department the volunteer serves in
    pub department_name: String,
}

/// A volunteer row about to be inserted at registration time
#[derive(Debug, Clone, PartialEq)]
pub struct NewVolunteer {
    pub name: String,
    pub email: String,
    /// ISO date string, as entered on the registration form
    pub birth_date: String,
    /// "L" or "P" on the reference form
    pub gender: String,
    pub address: String,
    pub department_id: i64,
    /// The 7-character volunteer code printed on the badge
    pub code: String,
    /// Public URL of the generated badge, None when the volunteer
    /// supplied a pre-existing badge of their own
    pub badge_url: Option<String>,
}
