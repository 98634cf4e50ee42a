// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use figment::Figment;
use serde::de::DeserializeOwned;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A part of the configuration, living under [`Self::PATH`]
pub trait ConfigurationSection: Sized + DeserializeOwned {
    /// The key this section lives under, `None` for the root
    const PATH: Option<&'static str> = None;

    /// Check the constraints the deserializer can't express
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    fn validate(&self, _figment: &Figment) -> Result<(), BoxError> {
        Ok(())
    }

    /// Load the section and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the section is missing, malformed or invalid
    fn extract(figment: &Figment) -> Result<Self, BoxError> {
        let this: Self = match Self::PATH {
            Some(path) => figment.extract_inner(path)?,
            None => figment.extract()?,
        };

        this.validate(figment)?;
        Ok(this)
    }
}

/// Loading of sections which can be left out of the configuration
pub trait ConfigurationSectionExt: ConfigurationSection + Default {
    /// Load the section, falling back to its default when it is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the section is present but malformed or invalid
    fn extract_or_default(figment: &Figment) -> Result<Self, BoxError> {
        match Self::PATH {
            Some(path) if !figment.contains(path) => Ok(Self::default()),
            _ => Self::extract(figment),
        }
    }
}

impl<T: ConfigurationSection + Default> ConfigurationSectionExt for T {}
