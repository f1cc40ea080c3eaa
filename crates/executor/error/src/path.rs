use std::fmt;

/// Response path of an error: field names and list indices from the root of the response.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Default, serde::Serialize)]
#[serde(transparent)]
pub struct ErrorPath(Vec<ErrorPathSegment>);

impl std::ops::Deref for ErrorPath {
    type Target = Vec<ErrorPathSegment>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for ErrorPath {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, serde::Serialize)]
#[serde(untagged)]
pub enum ErrorPathSegment {
    Field(Box<str>),
    Index(usize),
}

impl fmt::Display for ErrorPathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPathSegment::Field(name) => f.write_str(name),
            ErrorPathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}

pub trait InsertIntoErrorPath {
    fn insert_into(self, path: &mut ErrorPath);
}

impl InsertIntoErrorPath for &str {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Field(self.into()));
    }
}

impl InsertIntoErrorPath for String {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Field(self.into_boxed_str()));
    }
}

impl InsertIntoErrorPath for usize {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Index(self));
    }
}

impl InsertIntoErrorPath for ErrorPathSegment {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(self);
    }
}

impl InsertIntoErrorPath for &ErrorPathSegment {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(self.clone());
    }
}

trait InsertAllIntoErrorPath {
    fn insert_all_into(self, path: &mut ErrorPath);
}

impl<T: InsertIntoErrorPath> InsertAllIntoErrorPath for T {
    fn insert_all_into(self, path: &mut ErrorPath) {
        self.insert_into(path);
    }
}

impl<'a, T> InsertAllIntoErrorPath for &'a [T]
where
    &'a T: InsertIntoErrorPath,
{
    fn insert_all_into(self, path: &mut ErrorPath) {
        for item in self {
            item.insert_into(path);
        }
    }
}

impl<'a, T> InsertAllIntoErrorPath for &'a Vec<T>
where
    &'a T: InsertIntoErrorPath,
{
    fn insert_all_into(self, path: &mut ErrorPath) {
        self.as_slice().insert_all_into(path);
    }
}

impl<T1: InsertAllIntoErrorPath, T2: InsertAllIntoErrorPath> InsertAllIntoErrorPath for (T1, T2) {
    fn insert_all_into(self, path: &mut ErrorPath) {
        self.0.insert_all_into(path);
        self.1.insert_all_into(path);
    }
}

impl<T1: InsertAllIntoErrorPath, T2: InsertAllIntoErrorPath, T3: InsertAllIntoErrorPath> InsertAllIntoErrorPath
    for (T1, T2, T3)
{
    fn insert_all_into(self, path: &mut ErrorPath) {
        self.0.insert_all_into(path);
        self.1.insert_all_into(path);
        self.2.insert_all_into(path);
    }
}

impl<T: InsertAllIntoErrorPath> From<T> for ErrorPath {
    fn from(t: T) -> Self {
        let mut path = ErrorPath(Vec::new());
        t.insert_all_into(&mut path);
        path
    }
}
