use anyhow::Context;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::model::{Assignment, Course, Grade, Message, Role, Submission, UploadRecord, User};

pub const DATA_FILES: [&str; 9] = [
    "students.json",
    "teachers.json",
    "admins.json",
    "courses.json",
    "messages.json",
    "assignments.json",
    "submissions.json",
    "grades.json",
    "uploads.json",
];

const UPLOAD_ROLE_DIRS: [&str; 4] = ["admin", "teachers", "students", "others"];

/// One JSON-array-backed record set. The whole array is rewritten on every
/// mutation; mutations are buffered and only become visible in memory after
/// the durable write succeeded.
pub struct Collection<T> {
    path: PathBuf,
    records: Vec<T>,
}

impl<T: Serialize + DeserializeOwned + Clone> Collection<T> {
    /// A missing file is a normal first run; a corrupt file is downgraded to
    /// a warning and an empty set so the process can keep serving.
    pub fn load(path: PathBuf) -> Collection<T> {
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<T>>(&text) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "could not parse {}, starting with empty collection: {}",
                        path.to_string_lossy(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "could not read {}, starting with empty collection: {}",
                        path.to_string_lossy(),
                        e
                    );
                }
                Vec::new()
            }
        };
        Collection { path, records }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Replace the full record set: persist first, then swap in memory.
    /// On a failed write the in-memory set keeps its pre-call contents.
    pub fn commit(&mut self, next: Vec<T>) -> anyhow::Result<()> {
        self.persist(&next)?;
        self.records = next;
        Ok(())
    }

    pub fn append(&mut self, record: T) -> anyhow::Result<()> {
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)
    }

    fn persist(&self, records: &[T]) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(records)
            .with_context(|| format!("failed to serialize {}", self.path.to_string_lossy()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("failed to move {} into place", self.path.to_string_lossy())
        })?;
        Ok(())
    }
}

/// The whole durable state of the daemon: one JSON file per entity
/// collection plus the uploads/ content directory, all under one root.
pub struct Workspace {
    pub root: PathBuf,
    pub students: Collection<User>,
    pub teachers: Collection<User>,
    pub admins: Collection<User>,
    pub courses: Collection<Course>,
    pub messages: Collection<Message>,
    pub assignments: Collection<Assignment>,
    pub submissions: Collection<Submission>,
    pub grades: Collection<Grade>,
    pub uploads: Collection<UploadRecord>,
}

impl Workspace {
    pub fn open(root: &Path) -> anyhow::Result<Workspace> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create workspace {}", root.to_string_lossy()))?;
        let uploads_dir = root.join("uploads");
        for role_dir in UPLOAD_ROLE_DIRS {
            std::fs::create_dir_all(uploads_dir.join(role_dir)).with_context(|| {
                format!("failed to create upload directory uploads/{}", role_dir)
            })?;
        }

        Ok(Workspace {
            root: root.to_path_buf(),
            students: Collection::load(root.join("students.json")),
            teachers: Collection::load(root.join("teachers.json")),
            admins: Collection::load(root.join("admins.json")),
            courses: Collection::load(root.join("courses.json")),
            messages: Collection::load(root.join("messages.json")),
            assignments: Collection::load(root.join("assignments.json")),
            submissions: Collection::load(root.join("submissions.json")),
            grades: Collection::load(root.join("grades.json")),
            uploads: Collection::load(root.join("uploads.json")),
        })
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    /// Principals share the admins file.
    pub fn users_for_role(&self, role: Role) -> &Collection<User> {
        match role {
            Role::Student => &self.students,
            Role::Teacher => &self.teachers,
            Role::Admin | Role::Principal => &self.admins,
        }
    }

    pub fn users_for_role_mut(&mut self, role: Role) -> &mut Collection<User> {
        match role {
            Role::Student => &mut self.students,
            Role::Teacher => &mut self.teachers,
            Role::Admin | Role::Principal => &mut self.admins,
        }
    }

    pub fn all_users(&self) -> impl Iterator<Item = &User> {
        self.students
            .records()
            .iter()
            .chain(self.teachers.records())
            .chain(self.admins.records())
    }
}
