//! Built-in configuration: the emscripten build of the GLSL optimizer.

use crate::config::{BuildConfig, Sequence};
use crate::flags::{FlagProfile, Switches};
use crate::job::Target;

pub const DEFAULT_TOOLCHAIN: &str = "/usr/lib/emsdk_portable/emscripten/1.30.0/emcc";

pub const COMBINED_SEQUENCE: &str = "combined";
pub const STAGED_SEQUENCE: &str = "staged";

const INTERMEDIATE_ARTIFACT: &str = "glslopt.bc";
const FINAL_ARTIFACT: &str = "glsl-optimizer.js";
const BINDINGS_SOURCE: &str = "src/emscripten/EmMain.cpp";
const EXPORTED_FUNCTIONS: &str = "EXPORTED_FUNCTIONS=['_optimize_glsl']";

/// Optimizer sources, in link order.
pub const OPTIMIZER_SOURCES: &[&str] = &[
    // libmesa
    "src/mesa/program/prog_hash_table.c",
    "src/mesa/program/symbol_table.c",
    "src/mesa/main/imports.c",

    // libglcpp
    "src/glsl/glcpp/glcpp-lex.c",
    "src/glsl/glcpp/glcpp-parse.c",
    "src/glsl/glcpp/pp.c",
    "src/util/hash_table.c",
    "src/util/ralloc.c",

    // libglslopt
    "src/glsl/ast_array_index.cpp",
    "src/glsl/ast_expr.cpp",
    "src/glsl/ast_function.cpp",
    "src/glsl/ast_to_hir.cpp",
    "src/glsl/ast_type.cpp",
    "src/glsl/builtin_functions.cpp",
    "src/glsl/builtin_types.cpp",
    "src/glsl/builtin_variables.cpp",
    "src/glsl/glsl_lexer.cpp",
    "src/glsl/glsl_optimizer.cpp",
    "src/glsl/glsl_parser.cpp",
    "src/glsl/glsl_parser_extras.cpp",
    "src/glsl/glsl_symbol_table.cpp",
    "src/glsl/glsl_types.cpp",
    "src/glsl/hir_field_selection.cpp",
    "src/glsl/ir.cpp",
    "src/glsl/ir_basic_block.cpp",
    "src/glsl/ir_builder.cpp",
    "src/glsl/ir_clone.cpp",
    "src/glsl/ir_constant_expression.cpp",
    "src/glsl/ir_equals.cpp",
    "src/glsl/ir_expression_flattening.cpp",
    "src/glsl/ir_function.cpp",
    "src/glsl/ir_function_can_inline.cpp",
    "src/glsl/ir_function_detect_recursion.cpp",
    "src/glsl/ir_hierarchical_visitor.cpp",
    "src/glsl/ir_hv_accept.cpp",
    "src/glsl/ir_import_prototypes.cpp",
    "src/glsl/ir_print_glsl_visitor.cpp",
    "src/glsl/ir_print_metal_visitor.cpp",
    "src/glsl/ir_print_visitor.cpp",
    "src/glsl/ir_rvalue_visitor.cpp",
    "src/glsl/ir_stats.cpp",
    "src/glsl/ir_unused_structs.cpp",
    "src/glsl/ir_validate.cpp",
    "src/glsl/ir_variable_refcount.cpp",
    "src/glsl/link_atomics.cpp",
    "src/glsl/link_functions.cpp",
    "src/glsl/link_interface_blocks.cpp",
    "src/glsl/link_uniform_block_active_visitor.cpp",
    "src/glsl/link_uniform_blocks.cpp",
    "src/glsl/link_uniform_initializers.cpp",
    "src/glsl/link_uniforms.cpp",
    "src/glsl/link_varyings.cpp",
    "src/glsl/linker.cpp",
    "src/glsl/loop_analysis.cpp",
    "src/glsl/loop_controls.cpp",
    "src/glsl/loop_unroll.cpp",
    "src/glsl/lower_clip_distance.cpp",
    "src/glsl/lower_discard.cpp",
    "src/glsl/lower_discard_flow.cpp",
    "src/glsl/lower_if_to_cond_assign.cpp",
    "src/glsl/lower_instructions.cpp",
    "src/glsl/lower_jumps.cpp",
    "src/glsl/lower_mat_op_to_vec.cpp",
    "src/glsl/lower_named_interface_blocks.cpp",
    "src/glsl/lower_noise.cpp",
    "src/glsl/lower_offset_array.cpp",
    "src/glsl/lower_output_reads.cpp",
    "src/glsl/lower_packed_varyings.cpp",
    "src/glsl/lower_packing_builtins.cpp",
    "src/glsl/lower_ubo_reference.cpp",
    "src/glsl/lower_variable_index_to_cond_assign.cpp",
    "src/glsl/lower_vec_index_to_cond_assign.cpp",
    "src/glsl/lower_vec_index_to_swizzle.cpp",
    "src/glsl/lower_vector.cpp",
    "src/glsl/lower_vector_insert.cpp",
    "src/glsl/lower_vertex_id.cpp",
    "src/glsl/opt_algebraic.cpp",
    "src/glsl/opt_array_splitting.cpp",
    "src/glsl/opt_constant_folding.cpp",
    "src/glsl/opt_constant_propagation.cpp",
    "src/glsl/opt_constant_variable.cpp",
    "src/glsl/opt_copy_propagation.cpp",
    "src/glsl/opt_copy_propagation_elements.cpp",
    "src/glsl/opt_cse.cpp",
    "src/glsl/opt_dead_builtin_variables.cpp",
    "src/glsl/opt_dead_builtin_varyings.cpp",
    "src/glsl/opt_dead_code.cpp",
    "src/glsl/opt_dead_code_local.cpp",
    "src/glsl/opt_dead_functions.cpp",
    "src/glsl/opt_flatten_nested_if_blocks.cpp",
    "src/glsl/opt_flip_matrices.cpp",
    "src/glsl/opt_function_inlining.cpp",
    "src/glsl/opt_if_simplification.cpp",
    "src/glsl/opt_minmax.cpp",
    "src/glsl/opt_noop_swizzle.cpp",
    "src/glsl/opt_rebalance_tree.cpp",
    "src/glsl/opt_redundant_jumps.cpp",
    "src/glsl/opt_structure_splitting.cpp",
    "src/glsl/opt_swizzle_swizzle.cpp",
    "src/glsl/opt_tree_grafting.cpp",
    "src/glsl/opt_vector_splitting.cpp",
    "src/glsl/opt_vectorize.cpp",
    "src/glsl/s_expression.cpp",
    "src/glsl/strtod.c",
    "src/glsl/standalone_scaffolding.cpp",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_switches() -> Switches {
    let mut switches = Switches::new();
    switches.insert("TOTAL_MEMORY", 33554432);
    switches.insert("EMTERPRETIFY", 1);
    switches
}

/// Compile every optimizer source into the intermediate bitcode artifact.
fn compile_target() -> Target {
    Target {
        id: "compile".to_string(),
        label: Some("Compile optimizer to bitcode".to_string()),
        include_dirs: strings(&["src", "src/mesa", "include"]),
        inputs: strings(OPTIMIZER_SOURCES),
        defines: strings(&["HAVE___BUILTIN_FFS=0"]),
        output: INTERMEDIATE_ARTIFACT.to_string(),
        extra_args: Vec::new(),
    }
}

/// Link the bitcode with the embind bindings into the final script.
fn package_target() -> Target {
    Target {
        id: "package".to_string(),
        label: Some("Package bitcode with bindings".to_string()),
        include_dirs: strings(&["src/glsl"]),
        inputs: strings(&[INTERMEDIATE_ARTIFACT, BINDINGS_SOURCE]),
        defines: strings(&["USE_EMBINDS=1"]),
        output: FINAL_ARTIFACT.to_string(),
        extra_args: strings(&["--bind", "-s", EXPORTED_FUNCTIONS]),
    }
}

fn all_target() -> Target {
    let mut inputs = strings(OPTIMIZER_SOURCES);
    inputs.push(BINDINGS_SOURCE.to_string());

    Target {
        id: "all".to_string(),
        label: Some("Build optimizer and bindings in one pass".to_string()),
        include_dirs: strings(&["src", "src/mesa", "include", "src/glsl"]),
        inputs,
        defines: strings(&["HAVE___BUILTIN_FFS=0"]),
        output: FINAL_ARTIFACT.to_string(),
        extra_args: strings(&["-s", EXPORTED_FUNCTIONS]),
    }
}

pub fn glsl_optimizer() -> BuildConfig {
    BuildConfig {
        toolchain: DEFAULT_TOOLCHAIN.to_string(),
        debug: false,
        flags: FlagProfile::default(),
        switches: default_switches(),
        targets: vec![compile_target(), package_target(), all_target()],
        sequences: vec![
            Sequence {
                id: COMBINED_SEQUENCE.to_string(),
                targets: strings(&["all"]),
            },
            Sequence {
                id: STAGED_SEQUENCE.to_string(),
                targets: strings(&["compile", "package"]),
            },
        ],
        default_sequence: COMBINED_SEQUENCE.to_string(),
    }
}
