//! Class and method scope
//!
//! The optimizer is driven over a scope: a list of classes, each with
//! methods that may or may not carry code. `walk_code` visits every
//! method body; abstract and native methods are skipped.

use super::block::MethodCode;

/// A method within a class
#[derive(Debug, Clone)]
pub struct DexMethod {
    /// Method name, for diagnostics
    pub name: String,
    /// The method body; `None` for abstract and native methods
    pub code: Option<MethodCode>,
}

impl DexMethod {
    /// Create a method with a body
    pub fn with_code(name: impl Into<String>, code: MethodCode) -> Self {
        Self {
            name: name.into(),
            code: Some(code),
        }
    }

    /// Create a method without a body
    pub fn abstract_method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
        }
    }
}

/// A class and its methods
#[derive(Debug, Clone)]
pub struct DexClass {
    /// Class descriptor, for diagnostics
    pub descriptor: String,
    /// The class's methods
    pub methods: Vec<DexMethod>,
}

impl DexClass {
    /// Create a class
    pub fn new(descriptor: impl Into<String>, methods: Vec<DexMethod>) -> Self {
        Self {
            descriptor: descriptor.into(),
            methods,
        }
    }
}

/// Visit every method body in the scope
///
/// Methods without code are skipped. The callback receives the method
/// name and its mutable body.
pub fn walk_code<F>(scope: &mut [DexClass], mut f: F)
where
    F: FnMut(&str, &mut MethodCode),
{
    for class in scope {
        for method in &mut class.methods {
            if let Some(code) = method.code.as_mut() {
                f(&method.name, code);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::IrInstruction;
    use crate::ir::opcodes::Opcode;

    #[test]
    fn test_walk_skips_methods_without_code() {
        let code = MethodCode::from_instructions(vec![IrInstruction::new(Opcode::ReturnVoid)]);
        let mut scope = vec![DexClass::new(
            "LFoo;",
            vec![
                DexMethod::with_code("bar", code),
                DexMethod::abstract_method("baz"),
            ],
        )];
        let mut seen = Vec::new();
        walk_code(&mut scope, |name, _| seen.push(name.to_string()));
        assert_eq!(seen, vec!["bar"]);
    }
}
