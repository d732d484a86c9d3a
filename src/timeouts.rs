// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-operation deadlines, configured with a `timeouts` block

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueString};
use tf_provider::{AttributePath, Diagnostics};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Operation::Create => "creating",
            Operation::Read => "retrieving",
            Operation::Update => "updating",
            Operation::Delete => "deleting",
        }
    }
}

/// Default deadline of each operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Defaults {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    pub fn get(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// `timeouts` block of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Timeouts<'a> {
    #[serde(borrow = "'a")]
    pub create: ValueString<'a>,
    pub read: ValueString<'a>,
    pub update: ValueString<'a>,
    pub delete: ValueString<'a>,
}

/// `timeouts` block of a data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReadTimeouts<'a> {
    #[serde(borrow = "'a")]
    pub read: ValueString<'a>,
}

pub trait WithTimeouts {
    fn configured(&self, operation: Operation) -> Option<&str>;

    /// Deadline of `operation`, falling back on `defaults` when not configured
    fn duration(&self, operation: Operation, defaults: &Defaults) -> Duration {
        self.configured(operation)
            .and_then(|timeout| parse_duration(timeout).ok())
            .unwrap_or_else(|| defaults.get(operation))
    }

    fn validate(&self, diags: &mut Diagnostics, operations: &[Operation]) {
        for &operation in operations {
            if let Some(timeout) = self.configured(operation) {
                if let Err(err) = parse_duration(timeout) {
                    diags.error(
                        "Invalid timeout",
                        err.to_string(),
                        AttributePath::new("timeouts")
                            .index(0)
                            .attribute(operation.name()),
                    );
                }
            }
        }
    }
}

impl WithTimeouts for Timeouts<'_> {
    fn configured(&self, operation: Operation) -> Option<&str> {
        let timeout = match operation {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        };
        timeout.as_deref_option()
    }
}

impl WithTimeouts for ReadTimeouts<'_> {
    fn configured(&self, operation: Operation) -> Option<&str> {
        match operation {
            Operation::Read => self.read.as_deref_option(),
            _ => None,
        }
    }
}

impl<T: WithTimeouts> WithTimeouts for Value<T> {
    fn configured(&self, operation: Operation) -> Option<&str> {
        self.as_ref_option()
            .and_then(|timeouts| timeouts.configured(operation))
    }
}

/// Schema of the `timeouts` block for the given operations
pub fn schema(operations: &[Operation], defaults: &Defaults) -> NestedBlock {
    let attributes = operations
        .iter()
        .map(|&operation| {
            (
                operation.name().to_owned(),
                Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain(format!(
                        "Deadline of the {} operation (default: {}m)",
                        operation.name(),
                        defaults.get(operation).as_secs() / 60,
                    )),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
            )
        })
        .collect();
    NestedBlock::Optional(Block {
        attributes,
        description: Description::plain("Deadlines of the operations"),
        ..Default::default()
    })
}

/// An operation did not complete before its deadline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} {id}: timeout after {timeout:?}")]
pub struct TimeoutError {
    pub operation: &'static str,
    pub id: String,
    pub timeout: Duration,
}

/// Run `future` with the deadline of `operation`
pub async fn run<T, F>(
    operation: Operation,
    timeout: Duration,
    id: impl Display,
    future: F,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError {
            operation: operation.verb(),
            id: id.to_string(),
            timeout,
        }
        .into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {input:?}: expected a sequence of numbers with units, like \"1h30m\" or \"45s\"")]
pub struct DurationError {
    input: String,
}

/// Parse a duration like `"1h30m"`, `"90s"` or `"1.5h"`
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError {
        input: input.to_owned(),
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "h" => 3_600_000_000_000.0,
            "m" => 60_000_000_000.0,
            "s" => 1_000_000_000.0,
            "ms" => 1_000_000.0,
            "us" | "\u{b5}s" => 1_000.0,
            "ns" => 1.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        nanos += number * unit;
    }

    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_go_durations() {
        assert_eq!(parse_duration("30m"), Ok(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn reject_invalid_durations() {
        for input in ["", "30", "m", "10 minutes", "1h-5m", "1..5h"] {
            assert!(parse_duration(input).is_err(), "{input}");
        }
    }

    #[test]
    fn configured_timeout_overrides_default() {
        let defaults = Defaults::minutes(30, 5, 30, 30);
        let timeouts = Value::Value(Timeouts {
            create: "1h".into(),
            ..Default::default()
        });

        assert_eq!(
            timeouts.duration(Operation::Create, &defaults),
            Duration::from_secs(3600)
        );
        assert_eq!(
            timeouts.duration(Operation::Delete, &defaults),
            Duration::from_secs(1800)
        );
        assert_eq!(
            Value::<Timeouts>::Null.duration(Operation::Read, &defaults),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn validate_reports_path() {
        let timeouts = Timeouts {
            update: "soon".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        timeouts.validate(&mut diags, &[Operation::Create, Operation::Update]);
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_reports_deadline() {
        let err = run(
            Operation::Create,
            Duration::from_secs(5),
            "/subscriptions/0000",
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "creating /subscriptions/0000: timeout after 5s"
        );
    }
}
