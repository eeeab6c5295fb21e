//! Module constructor proxies
//!
//! A module with a non-public nullary constructor cannot be instantiated
//! from generated code in another package. For such modules a sibling proxy
//! type with a public static `newInstance()` is generated, and component
//! code routes through it exactly when the constructor is invisible from
//! the requesting package. The indirection is a pure function of module
//! visibility and requester package.

use crate::ast::{
    Expr, MethodSpec, Modifier, SourceFile, TypeName, TypeSpec,
};
use crate::decl::{ConstructorDescriptor, ModuleDescriptor};
use crate::key::{ClassName, Visibility};

/// Name of the generated proxy method.
pub const PROXY_METHOD: &str = "newInstance";

/// The sibling type hosting a module's constructor proxy: `M_Proxy` for a
/// module `M`, flattening nested names.
pub fn proxy_type_name(module: &ClassName) -> ClassName {
    module.peer(format!("{}_Proxy", module.joined_simple_names()))
}

/// The proxied constructor: non-public, non-private, and nullary. Abstract
/// modules and modules with an implicit enclosing-instance reference have
/// no proxyable constructor.
pub fn nonpublic_nullary_constructor(
    module: &ModuleDescriptor,
) -> Option<&ConstructorDescriptor> {
    if module.is_abstract || module.is_inner {
        return None;
    }
    module.constructors.iter().find(|constructor| {
        constructor.visibility != Visibility::Public
            && constructor.visibility != Visibility::Private
            && constructor.parameter_count == 0
    })
}

/// Generate the proxy source file for a module, when one is needed.
pub fn generate_proxy(module: &ModuleDescriptor) -> Option<SourceFile> {
    nonpublic_nullary_constructor(module)?;

    let proxy_name = proxy_type_name(&module.name);
    let mut spec = TypeSpec::class(proxy_name.simple_name());
    spec.modifiers = vec![Modifier::Public, Modifier::Final];

    let mut constructor = MethodSpec::constructor();
    constructor.modifiers = vec![Modifier::Private];
    spec.methods.push(constructor);

    let mut new_instance = MethodSpec::method(PROXY_METHOD);
    new_instance.modifiers = vec![Modifier::Public, Modifier::Static];
    new_instance.return_type = Some(TypeName::of(module.name.clone()));
    new_instance
        .statements
        .push(crate::ast::Statement::Return(Expr::new_instance(
            TypeName::of(module.name.clone()),
            Vec::new(),
        )));
    spec.methods.push(new_instance);

    Some(SourceFile {
        package: module.package().to_string(),
        type_spec: spec,
    })
}

/// An expression creating a new module instance from `requesting_package`:
/// the constructor when it is visible from there, the proxy otherwise.
pub fn new_module_instance(module: &ModuleDescriptor, requesting_package: &str) -> Expr {
    let through_proxy = nonpublic_nullary_constructor(module)
        .map(|constructor| {
            !constructor
                .visibility
                .accessible_from(module.package(), requesting_package)
        })
        .unwrap_or(false);

    if through_proxy {
        Expr::static_call(proxy_type_name(&module.name), PROXY_METHOD, Vec::new())
    } else {
        Expr::new_instance(TypeName::of(module.name.clone()), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_private_module(package: &str, name: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(ClassName::new(package, name)).constructors(vec![
            ConstructorDescriptor {
                visibility: Visibility::PackagePrivate,
                parameter_count: 0,
            },
        ])
    }

    #[test]
    fn test_proxy_name_flattens_nesting() {
        let nested = ClassName::new("lib", "Outer").nested("InnerModule");
        assert_eq!(
            proxy_type_name(&nested).canonical_name(),
            "lib.Outer_InnerModule_Proxy"
        );
    }

    #[test]
    fn test_public_constructor_needs_no_proxy() {
        let module = ModuleDescriptor::new(ClassName::new("lib", "M"));
        assert!(nonpublic_nullary_constructor(&module).is_none());
        assert!(generate_proxy(&module).is_none());
    }

    #[test]
    fn test_abstract_module_has_no_proxy() {
        let module = package_private_module("lib", "M").abstract_module();
        assert!(nonpublic_nullary_constructor(&module).is_none());
    }

    #[test]
    fn test_private_constructor_cannot_be_proxied() {
        let module = ModuleDescriptor::new(ClassName::new("lib", "M")).constructors(vec![
            ConstructorDescriptor {
                visibility: Visibility::Private,
                parameter_count: 0,
            },
        ]);
        assert!(nonpublic_nullary_constructor(&module).is_none());
    }

    #[test]
    fn test_proxy_generation() {
        let module = package_private_module("lib", "M");
        let proxy = generate_proxy(&module).unwrap();
        assert_eq!(proxy.type_name().canonical_name(), "lib.M_Proxy");

        let new_instance = proxy.type_spec.method(PROXY_METHOD).unwrap();
        assert!(new_instance.modifiers.contains(&Modifier::Static));
        assert_eq!(
            new_instance.return_type,
            Some(TypeName::of(ClassName::new("lib", "M")))
        );
        // The constructor of the proxy itself is private.
        let constructor = proxy
            .type_spec
            .methods
            .iter()
            .find(|m| m.is_constructor)
            .unwrap();
        assert_eq!(constructor.modifiers, vec![Modifier::Private]);
    }

    #[test]
    fn test_instantiation_routes_by_package() {
        let module = package_private_module("lib", "M");

        // Same package: call the constructor directly.
        assert_eq!(
            new_module_instance(&module, "lib"),
            Expr::new_instance(TypeName::of(ClassName::new("lib", "M")), Vec::new())
        );
        // Different package: route through the proxy.
        assert_eq!(
            new_module_instance(&module, "app"),
            Expr::static_call(ClassName::new("lib", "M_Proxy"), PROXY_METHOD, Vec::new())
        );
    }

    #[test]
    fn test_public_module_instantiated_directly_everywhere() {
        let module = ModuleDescriptor::new(ClassName::new("lib", "M"));
        assert_eq!(
            new_module_instance(&module, "app"),
            Expr::new_instance(TypeName::of(ClassName::new("lib", "M")), Vec::new())
        );
    }
}
