use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use capacita_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Backend-defined permission key such as `manage_trainings`.
///
/// Keys are lowercase ASCII, start with a letter and may contain digits,
/// `_` and `.` separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a validated permission key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let starts_with_letter = trimmed
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_lowercase());
        let has_valid_chars = trimmed.chars().all(|character| {
            character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_'
                || character == '.'
        });

        if !starts_with_letter || !has_valid_chars {
            return Err(AppError::Validation(format!(
                "invalid permission key '{value}'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl From<Permission> for PermissionKey {
    fn from(value: Permission) -> Self {
        Self(value.as_str().to_owned())
    }
}

impl AsRef<str> for PermissionKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for PermissionKey {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Grouping used by the role editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Training sessions and their lifecycle.
    Trainings,
    /// Employee records.
    Employees,
    /// Training plans and programs.
    Plans,
    /// Exams, diplomas and other documents.
    Documents,
    /// Roles and grants.
    Security,
}

impl PermissionCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trainings => "trainings",
            Self::Employees => "employees",
            Self::Plans => "plans",
            Self::Documents => "documents",
            Self::Security => "security",
        }
    }
}

/// Permissions the console itself checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading training sessions.
    ViewTrainings,
    /// Allows creating, assigning and cancelling training sessions.
    ManageTrainings,
    /// Allows a trainer to run and finalize a session.
    RunTrainings,
    /// Allows HR to approve or reject finalized sessions.
    ReviewTrainings,
    /// Allows reading employee records.
    ViewEmployees,
    /// Allows mutating employee records.
    ManageEmployees,
    /// Allows managing plans and programs.
    ManagePlans,
    /// Allows managing documents such as diplomas.
    ManageDocuments,
    /// Allows managing roles and grants.
    ManageRoles,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewTrainings => "view_trainings",
            Self::ManageTrainings => "manage_trainings",
            Self::RunTrainings => "run_trainings",
            Self::ReviewTrainings => "review_trainings",
            Self::ViewEmployees => "view_employees",
            Self::ManageEmployees => "manage_employees",
            Self::ManagePlans => "manage_plans",
            Self::ManageDocuments => "manage_documents",
            Self::ManageRoles => "manage_roles",
        }
    }

    /// Returns the category this permission is listed under.
    #[must_use]
    pub fn category(&self) -> PermissionCategory {
        match self {
            Self::ViewTrainings
            | Self::ManageTrainings
            | Self::RunTrainings
            | Self::ReviewTrainings => PermissionCategory::Trainings,
            Self::ViewEmployees | Self::ManageEmployees => PermissionCategory::Employees,
            Self::ManagePlans => PermissionCategory::Plans,
            Self::ManageDocuments => PermissionCategory::Documents,
            Self::ManageRoles => PermissionCategory::Security,
        }
    }

    /// Returns the human-readable description shown in the role editor.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ViewTrainings => "View training sessions",
            Self::ManageTrainings => "Create, assign and cancel training sessions",
            Self::RunTrainings => "Run sessions and record attendance, grades and exams",
            Self::ReviewTrainings => "Approve or reject sessions finalized by trainers",
            Self::ViewEmployees => "View employees",
            Self::ManageEmployees => "Create and edit employees",
            Self::ManagePlans => "Manage training plans and programs",
            Self::ManageDocuments => "Manage exams, diplomas and other documents",
            Self::ManageRoles => "Manage roles and permission grants",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::ViewTrainings,
            Permission::ManageTrainings,
            Permission::RunTrainings,
            Permission::ReviewTrainings,
            Permission::ViewEmployees,
            Permission::ManageEmployees,
            Permission::ManagePlans,
            Permission::ManageDocuments,
            Permission::ManageRoles,
        ];

        ALL
    }

    /// Converts a slice of permissions into backend keys.
    #[must_use]
    pub fn keys(permissions: &[Self]) -> Vec<PermissionKey> {
        permissions.iter().copied().map(PermissionKey::from).collect()
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// One entry of the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Unique permission key.
    pub key: PermissionKey,
    /// Category the key is grouped under.
    pub category: PermissionCategory,
    /// Description shown in the role editor.
    pub description: String,
}

impl From<Permission> for PermissionDefinition {
    fn from(value: Permission) -> Self {
        Self {
            key: PermissionKey::from(value),
            category: value.category(),
            description: value.description().to_owned(),
        }
    }
}

/// Registry of permission keys. Keys are unique system-wide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    definitions: BTreeMap<PermissionKey, PermissionDefinition>,
}

impl PermissionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding every built-in permission.
    #[must_use]
    pub fn with_builtin_permissions() -> Self {
        let definitions = Permission::all()
            .iter()
            .map(|permission| {
                let definition = PermissionDefinition::from(*permission);
                (definition.key.clone(), definition)
            })
            .collect();

        Self { definitions }
    }

    /// Registers a new permission definition.
    pub fn register(&mut self, definition: PermissionDefinition) -> AppResult<()> {
        if self.definitions.contains_key(&definition.key) {
            return Err(AppError::Conflict(format!(
                "permission '{}' is already registered",
                definition.key
            )));
        }

        self.definitions.insert(definition.key.clone(), definition);
        Ok(())
    }

    /// Finds one definition by key.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&PermissionDefinition> {
        self.definitions.get(key)
    }

    /// Lists the definitions of one category in key order.
    #[must_use]
    pub fn list_by_category(&self, category: PermissionCategory) -> Vec<&PermissionDefinition> {
        self.definitions
            .values()
            .filter(|definition| definition.category == category)
            .collect()
    }

    /// Ensures every key granted by the role is registered.
    pub fn validate_role(&self, role: &Role) -> AppResult<()> {
        if let Some(unknown) = role
            .permissions()
            .iter()
            .find(|key| !self.definitions.contains_key(key.as_str()))
        {
            return Err(AppError::Validation(format!(
                "role '{}' grants unknown permission '{unknown}'",
                role.name()
            )));
        }

        Ok(())
    }
}

/// Named set of permission keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: NonEmptyString,
    permissions: BTreeSet<PermissionKey>,
}

impl Role {
    /// Creates a role from its granted keys.
    pub fn new(
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = PermissionKey>,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the keys granted by this role.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<PermissionKey> {
        &self.permissions
    }

    /// Returns whether the role grants the key.
    #[must_use]
    pub fn grants(&self, key: &str) -> bool {
        self.permissions.contains(key)
    }
}

/// Console screens gated by permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Landing dashboard, open to every authenticated user.
    Dashboard,
    /// Employee directory.
    Employees,
    /// Training session list.
    Trainings,
    /// Single session with its roster.
    TrainingSession,
    /// Training plans.
    Plans,
    /// Training programs.
    Programs,
    /// Document library.
    Documents,
    /// Role and permission administration.
    Roles,
    /// HR review queue.
    Reviews,
}

impl Screen {
    /// Returns a stable route segment for the screen.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Employees => "employees",
            Self::Trainings => "trainings",
            Self::TrainingSession => "training_session",
            Self::Plans => "plans",
            Self::Programs => "programs",
            Self::Documents => "documents",
            Self::Roles => "roles",
            Self::Reviews => "reviews",
        }
    }

    /// Returns the permissions of which the user needs at least one.
    ///
    /// An empty list means the screen is public to authenticated users.
    #[must_use]
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            Self::Dashboard => &[],
            Self::Employees => &[Permission::ViewEmployees, Permission::ManageEmployees],
            Self::Trainings | Self::TrainingSession => &[
                Permission::ViewTrainings,
                Permission::ManageTrainings,
                Permission::RunTrainings,
                Permission::ReviewTrainings,
            ],
            Self::Plans | Self::Programs => &[Permission::ManagePlans],
            Self::Documents => &[Permission::ManageDocuments],
            Self::Roles => &[Permission::ManageRoles],
            Self::Reviews => &[Permission::ReviewTrainings],
        }
    }

    /// Returns all screens in navigation order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Screen] = &[
            Screen::Dashboard,
            Screen::Employees,
            Screen::Trainings,
            Screen::TrainingSession,
            Screen::Plans,
            Screen::Programs,
            Screen::Documents,
            Screen::Roles,
            Screen::Reviews,
        ];

        ALL
    }
}
