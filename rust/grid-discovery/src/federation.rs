use grid_location::Location;
use std::fmt;
use url::Url;

/// The registries of a federation, in canonical order.
///
/// Registries are sorted and de-duplicated on construction, so two sets
/// listing the same URLs in a different order are equal and hash alike.
/// This is the key under which discovered sites are cached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrySet(Vec<Url>);

impl RegistrySet {
    /// Build a set from any collection of registry URLs.
    pub fn new(registries: impl IntoIterator<Item = Url>) -> Self {
        let mut registries: Vec<Url> = registries.into_iter().collect();
        registries.sort();
        registries.dedup();
        Self(registries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Url> for RegistrySet {
    fn from_iter<T: IntoIterator<Item = Url>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// A grid and the registries that advertise its sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Federation {
    grid: Location,
    registries: RegistrySet,
}

impl Federation {
    /// Create a federation rooted at the grid enclosing `location`.
    pub fn new(location: &Location, registries: RegistrySet) -> Self {
        Self {
            grid: location.grid(),
            registries,
        }
    }

    /// The grid root location.
    pub fn grid(&self) -> &Location {
        &self.grid
    }

    /// The registries to query.
    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }
}

impl fmt::Display for Federation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grid)
    }
}
