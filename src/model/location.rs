//! Parser for the compact line-location encoding shared by the line inventory
//! and the ranking files: `package$Class#method(Type1, Type2):42`.

use std::fmt;

use serde::Serialize;

use crate::core::{Error, Result};

/// A method location without its line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodLocation {
    /// Package name, possibly empty for the default package.
    pub package: String,
    /// Class name as reported by the SFL tool (nested classes keep their `$`).
    pub class_name: String,
    /// Method name (`<init>` for constructors).
    pub method: String,
    /// Parameter types in declaration order, whitespace-trimmed.
    pub parameters: Vec<String>,
}

/// A fully qualified source line location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LineLocation {
    pub method: MethodLocation,
    pub line: u32,
}

impl fmt::Display for MethodLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}${}#{}({})",
            self.package,
            self.class_name,
            self.method,
            self.parameters.join(",")
        )
    }
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.line)
    }
}

/// Parse a `package$Class#method(params)` method location.
pub fn parse_method_location(input: &str) -> Result<MethodLocation> {
    let input = input.trim();
    let (package, rest) = input
        .split_once('$')
        .ok_or_else(|| Error::malformed_location(input, "missing '$' between package and class"))?;
    let (class_name, signature) = rest
        .split_once('#')
        .ok_or_else(|| Error::malformed_location(input, "missing '#' between class and method"))?;
    let (method, params) = signature
        .split_once('(')
        .ok_or_else(|| Error::malformed_location(input, "missing '(' after method name"))?;
    let params = params
        .strip_suffix(')')
        .ok_or_else(|| Error::malformed_location(input, "missing closing ')'"))?;

    if class_name.trim().is_empty() {
        return Err(Error::malformed_location(input, "empty class name"));
    }
    if method.trim().is_empty() {
        return Err(Error::malformed_location(input, "empty method name"));
    }

    let parameters = if params.trim().is_empty() {
        Vec::new()
    } else {
        params.split(',').map(|p| p.trim().to_string()).collect()
    };

    Ok(MethodLocation {
        package: package.trim().to_string(),
        class_name: class_name.trim().to_string(),
        method: method.trim().to_string(),
        parameters,
    })
}

/// Parse a `package$Class#method(params):line` line location.
pub fn parse_line_location(input: &str) -> Result<LineLocation> {
    let input = input.trim();
    let (method, line) = input
        .rsplit_once(':')
        .ok_or_else(|| Error::malformed_location(input, "missing ':<line>' suffix"))?;
    let line = line.trim().parse::<u32>().map_err(|e| {
        Error::malformed_location(input, format!("line number '{line}' is not an integer: {e}"))
    })?;
    let method = parse_method_location(method).map_err(|err| match err {
        // Report the whole row location rather than the stripped prefix.
        Error::MalformedLocation { reason, .. } => Error::malformed_location(input, reason),
        other => other,
    })?;
    Ok(LineLocation { method, line })
}
