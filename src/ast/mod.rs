/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: Core expression/statement enums and the program root
/// - expressions: Payloads and operators for compound expressions
/// - statements: Payloads for every statement kind
/// - types: Declared types and runtime value type tags
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
