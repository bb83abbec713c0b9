use grid_location::{Location, LocationError};
use url::Url;

/// A service endpoint advertised by a registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointReference {
    address: Url,
    site_name: Option<String>,
}

impl EndpointReference {
    /// An endpoint at `address` with no advertised site name.
    pub fn new(address: Url) -> Self {
        Self {
            address,
            site_name: None,
        }
    }

    /// Attach the site name the registry advertised for this endpoint.
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = Some(name.into());
        self
    }

    /// The endpoint address.
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// The advertised site name, if any.
    pub fn site_name(&self) -> Option<&str> {
        self.site_name.as_deref()
    }

    /// The location of the site this endpoint belongs to within `grid`.
    ///
    /// Sites are named by their advertised name, falling back to the
    /// endpoint's `host[:port]`.
    pub fn site_location(&self, grid: &Location) -> Result<Location, LocationError> {
        let name = match (&self.site_name, self.address.host_str()) {
            (Some(name), _) => name.clone(),
            (None, Some(host)) => match self.address.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            (None, None) => String::new(),
        };

        grid.grid().child(&name)
    }
}

impl From<Url> for EndpointReference {
    fn from(address: Url) -> Self {
        Self::new(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_names_sites_after_the_advertised_name() -> TestResult {
        let grid = Location::parse("grid:/europe")?;
        let endpoint = EndpointReference::new(Url::parse("https://fz-juelich.de:8080/site")?)
            .with_site_name("JUELICH");

        assert_eq!(
            endpoint.site_location(&grid)?,
            Location::parse("grid:/europe/JUELICH")?
        );
        Ok(())
    }

    #[test]
    fn it_falls_back_to_host_and_port() -> TestResult {
        let grid = Location::parse("grid:/europe/ignored/below")?;
        let endpoint = EndpointReference::new(Url::parse("https://fz-juelich.de:8080/site")?);

        assert_eq!(
            endpoint.site_location(&grid)?,
            Location::parse("grid:/europe/fz-juelich.de:8080")?
        );
        Ok(())
    }

    #[test]
    fn it_rejects_endpoints_without_a_name() -> TestResult {
        let grid = Location::parse("grid:/europe")?;
        let endpoint = EndpointReference::new(Url::parse("urn:site:1")?);

        assert!(endpoint.site_location(&grid).is_err());
        Ok(())
    }
}
