/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Case-insensitive, case-preserving, ordered header storage.
//!
//! `http::HeaderMap` was considered and rejected here: it lowercases header
//! names on insert, which loses the on-wire casing callers and verdict
//! interpreters rely on being able to see again.

/// A parsed ICAP response envelope: status line plus an ordered multi-map of
/// header name to values.
#[derive(Debug, Clone, Default)]
pub struct HeaderInformation {
    status: u16,
    reason: String,
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderInformation {
    /// Build an empty envelope with the given status line.
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        HeaderInformation {
            status,
            reason: reason.into(),
            entries: Vec::new(),
        }
    }

    /// ICAP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// ICAP reason phrase.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Append a header value, preserving the name's first-seen casing and
    /// insertion order. Multiple calls with the same name (any case)
    /// accumulate values under one entry.
    pub fn push(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        if let Some((_, values)) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            values.push(value.into());
        } else {
            self.entries.push((name.to_string(), vec![value.into()]));
        }
    }

    /// First value for a header name, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values for a header name, case-insensitive.
    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .into_iter()
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// True if a header with this name (any case) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Remove a header by name (any case), returning its values if present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let idx = self
            .entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterate over `(name, value)` pairs in insertion order, with one entry
    /// per value for multi-valued headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no headers at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = HeaderInformation::new(204, "No Content");
        headers.push("X-Virus-ID", "EICAR");
        assert_eq!(headers.get("x-virus-id"), Some("EICAR"));
        assert_eq!(headers.get("X-VIRUS-ID"), Some("EICAR"));
    }

    #[test]
    fn storage_preserves_first_seen_casing_and_order() {
        let mut headers = HeaderInformation::new(200, "OK");
        headers.push("ISTag", "\"abc\"");
        headers.push("Service", "ClamAV");
        headers.push("istag", "\"abc-2\"");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["ISTag", "ISTag", "Service"]);
        assert_eq!(headers.get_all("istag").collect::<Vec<_>>(), vec!["\"abc\"", "\"abc-2\""]);
    }

    #[test]
    fn remove_drops_all_values_for_name() {
        let mut headers = HeaderInformation::new(200, "OK");
        headers.push("X-ICAP-Statusline", "ICAP/1.0 200 OK");
        assert!(headers.contains("x-icap-statusline"));
        let removed = headers.remove("X-ICAP-Statusline");
        assert_eq!(removed, Some(vec!["ICAP/1.0 200 OK".to_string()]));
        assert!(!headers.contains("x-icap-statusline"));
    }
}
