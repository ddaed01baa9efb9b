//! `html_handling` state machine
//!
//! Each mode decides how `.html` extensions, `index.html` files and trailing
//! slashes map onto assets. Branches are evaluated top to bottom; the first
//! one that yields an asset or a redirect wins.
//!
//! A redirect from `file` to `destination` is only issued when `destination`
//! is not an asset itself and resolves (with redirects disabled) to the very
//! same asset as `file`, so following it never redirects again.

use std::future::Future;
use std::pin::Pin;

use super::ResolvedAsset;
use crate::config::HtmlHandling;
use crate::error::AssetStoreError;
use crate::store::{AssetPath, AssetStore};

/// Intermediate result of the html stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Asset(ResolvedAsset),
    Redirect(AssetPath),
}

type Step = Result<Option<Resolution>, AssetStoreError>;
type BoxedStep<'a> = Pin<Box<dyn Future<Output = Step> + Send + 'a>>;

/// Try each candidate in order, returning the first hit
macro_rules! first_of {
    ($($candidate:expr),+ $(,)?) => {
        $(
            if let Some(found) = $candidate.await? {
                return Ok(Some(found));
            }
        )+
    };
}

/// Resolve `path` under `mode`, returning `None` when nothing matched
pub async fn resolve_html<S: AssetStore>(
    store: &S,
    mode: HtmlHandling,
    path: &AssetPath,
    allow_redirects: bool,
) -> Step {
    let lookup = Lookup {
        store,
        mode,
        allow_redirects,
    };
    let path = path.as_str();

    match mode {
        HtmlHandling::AutoTrailingSlash => lookup.auto_trailing_slash(path).await,
        HtmlHandling::DropTrailingSlash => lookup.drop_trailing_slash(path).await,
        HtmlHandling::ForceTrailingSlash => lookup.force_trailing_slash(path).await,
        HtmlHandling::None => lookup.serve(path).await,
    }
}

/// Boxed entry point for the nested lookup done by redirect checks
fn resolve_without_redirects<'a, S: AssetStore>(
    store: &'a S,
    mode: HtmlHandling,
    path: &'a AssetPath,
) -> BoxedStep<'a> {
    Box::pin(resolve_html(store, mode, path, false))
}

struct Lookup<'a, S> {
    store: &'a S,
    mode: HtmlHandling,
    allow_redirects: bool,
}

impl<S: AssetStore> Lookup<'_, S> {
    async fn exists(&self, path: &str) -> Result<Option<ResolvedAsset>, AssetStoreError> {
        let path = AssetPath::from_normalized(path);
        let key = self.store.exists(&path).await?;
        Ok(key.map(|key| ResolvedAsset { path, key }))
    }

    /// Serve the asset stored at `path`, if any
    async fn serve(&self, path: &str) -> Step {
        Ok(self.exists(path).await?.map(Resolution::Asset))
    }

    /// Redirect to `destination` when it serves the same asset as `file`
    async fn redirect(&self, file: &str, destination: &str) -> Step {
        if !self.allow_redirects || destination.is_empty() {
            return Ok(None);
        }
        if self.exists(destination).await?.is_some() {
            return Ok(None);
        }
        let Some(source) = self.exists(file).await? else {
            return Ok(None);
        };

        let target = AssetPath::from_normalized(destination);
        match resolve_without_redirects(self.store, self.mode, &target).await? {
            Some(Resolution::Asset(asset)) if asset.key == source.key => {
                Ok(Some(Resolution::Redirect(target)))
            }
            _ => Ok(None),
        }
    }

    /// `/foo` serves `/foo.html`, `/foo/` serves `/foo/index.html`;
    /// the explicit file names redirect to those forms
    async fn auto_trailing_slash(&self, path: &str) -> Step {
        let exact = self.exists(path).await?;

        if let Some(stem) = path.strip_suffix("/index") {
            if let Some(asset) = exact {
                return Ok(Some(Resolution::Asset(asset)));
            }
            first_of!(
                self.redirect(&format!("{path}.html"), &format!("{stem}/")),
                self.redirect(&format!("{stem}.html"), stem),
            );
        } else if let Some(stem) = path.strip_suffix("/index.html") {
            first_of!(
                self.redirect(path, &format!("{stem}/")),
                self.redirect(&format!("{stem}.html"), stem),
            );
        } else if let Some(stem) = path.strip_suffix('/') {
            first_of!(
                self.serve(&format!("{path}index.html")),
                self.redirect(&format!("{stem}.html"), stem),
            );
        } else if let Some(stem) = path.strip_suffix(".html") {
            first_of!(
                self.redirect(path, stem),
                self.redirect(&format!("{stem}/index.html"), &format!("{stem}/")),
            );
        }

        if let Some(asset) = exact {
            return Ok(Some(Resolution::Asset(asset)));
        }
        if path.ends_with('/') {
            return Ok(None);
        }
        first_of!(
            self.serve(&format!("{path}.html")),
            self.redirect(&format!("{path}/index.html"), &format!("{path}/")),
        );
        Ok(None)
    }

    /// Canonical form never ends in a slash (except the root)
    async fn drop_trailing_slash(&self, path: &str) -> Step {
        let exact = self.exists(path).await?;

        if let Some(stem) = path.strip_suffix("/index") {
            if let Some(asset) = exact {
                return Ok(Some(Resolution::Asset(asset)));
            }
            if stem.is_empty() {
                first_of!(self.redirect("/index.html", "/"));
            } else {
                first_of!(
                    self.redirect(&format!("{stem}.html"), stem),
                    self.redirect(&format!("{path}.html"), stem),
                );
            }
        } else if path == "/" {
            first_of!(self.serve("/index.html"));
        } else if let Some(stem) = path.strip_suffix("/index.html") {
            if stem.is_empty() {
                first_of!(self.redirect(path, "/"));
            } else {
                first_of!(self.redirect(path, stem));
                if let Some(asset) = exact {
                    return Ok(Some(Resolution::Asset(asset)));
                }
                first_of!(self.redirect(&format!("{stem}.html"), stem));
            }
        } else if let Some(stem) = path.strip_suffix('/') {
            first_of!(
                self.redirect(&format!("{path}index.html"), stem),
                self.redirect(&format!("{stem}.html"), stem),
            );
        } else if let Some(stem) = path.strip_suffix(".html") {
            first_of!(
                self.redirect(path, stem),
                self.redirect(&format!("{stem}/index.html"), stem),
            );
        }

        if let Some(asset) = exact {
            return Ok(Some(Resolution::Asset(asset)));
        }
        if path.ends_with('/') {
            return Ok(None);
        }
        first_of!(
            self.serve(&format!("{path}.html")),
            self.serve(&format!("{path}/index.html")),
        );
        Ok(None)
    }

    /// Canonical form of every html page ends in a slash
    async fn force_trailing_slash(&self, path: &str) -> Step {
        let exact = self.exists(path).await?;

        if let Some(stem) = path.strip_suffix("/index") {
            if let Some(asset) = exact {
                return Ok(Some(Resolution::Asset(asset)));
            }
            first_of!(
                self.redirect(&format!("{path}.html"), &format!("{stem}/")),
                self.redirect(&format!("{stem}.html"), &format!("{stem}/")),
            );
        } else if let Some(stem) = path.strip_suffix("/index.html") {
            first_of!(
                self.redirect(path, &format!("{stem}/")),
                self.redirect(&format!("{stem}.html"), &format!("{stem}/")),
            );
        } else if let Some(stem) = path.strip_suffix('/') {
            first_of!(self.serve(&format!("{path}index.html")));
            if !stem.is_empty() {
                first_of!(self.serve(&format!("{stem}.html")));
            }
        } else if let Some(stem) = path.strip_suffix(".html") {
            first_of!(self.redirect(path, &format!("{stem}/")));
            if let Some(asset) = exact {
                return Ok(Some(Resolution::Asset(asset)));
            }
            first_of!(self.redirect(&format!("{stem}/index.html"), &format!("{stem}/")));
        }

        if let Some(asset) = exact {
            return Ok(Some(Resolution::Asset(asset)));
        }
        if path.ends_with('/') {
            return Ok(None);
        }
        first_of!(
            self.redirect(&format!("{path}.html"), &format!("{path}/")),
            self.redirect(&format!("{path}/index.html"), &format!("{path}/")),
        );
        Ok(None)
    }
}
