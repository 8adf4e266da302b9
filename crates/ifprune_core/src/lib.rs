pub mod chew;
pub mod conflict;
pub mod despatch;
pub mod edit;
pub mod engine;
pub mod eval;
pub mod ifstate;
pub mod logging;
pub mod settings;
pub mod source;
pub mod status;
pub mod symbols;

pub use engine::Engine;
pub use settings::Settings;
pub use status::{EngineError, StatusFlags};
pub use symbols::SymbolTable;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use crate::settings::{ConflictPolicy, DiscardPolicy, SymbolsPolicy};

    use super::*;
    use pretty_assertions::assert_eq;

    fn run_with(
        input: &str,
        defines: &[&str],
        undefines: &[&str],
        tweak: impl FnOnce(&mut Settings),
    ) -> (String, StatusFlags) {
        let mut settings = Settings::default();
        tweak(&mut settings);
        let mut symbols = SymbolTable::new();
        for d in defines {
            symbols.assume_defined(d).unwrap();
        }
        for u in undefines {
            symbols.assume_undefined(u).unwrap();
        }
        let mut out = Vec::new();
        let status = {
            let mut engine = Engine::new(
                &settings,
                &mut symbols,
                Box::new(input.as_bytes()),
                "test.c",
                &mut out,
            );
            engine.run().unwrap()
        };
        (String::from_utf8(out).unwrap(), status)
    }

    fn run(input: &str, defines: &[&str], undefines: &[&str]) -> String {
        run_with(input, defines, undefines, |_| {}).0
    }

    fn run_err(input: &str, defines: &[&str], undefines: &[&str]) -> EngineError {
        let settings = Settings::default();
        let mut symbols = SymbolTable::new();
        for d in defines {
            symbols.assume_defined(d).unwrap();
        }
        for u in undefines {
            symbols.assume_undefined(u).unwrap();
        }
        let mut out = Vec::new();
        let mut engine = Engine::new(
            &settings,
            &mut symbols,
            Box::new(input.as_bytes()),
            "test.c",
            &mut out,
        );
        engine.run().unwrap_err()
    }

    #[test]
    fn ifdef_collapse() {
        let input = "#ifdef FOO\nX\n#else\nY\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "X\n");
        assert_eq!(run(input, &[], &["FOO"]), "Y\n");
    }

    #[test]
    fn ifndef_collapse() {
        let input = "#ifndef FOO\nX\n#else\nY\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "Y\n");
        assert_eq!(run(input, &[], &["FOO"]), "X\n");
    }

    #[test]
    fn complement_keeps_the_other_branch() {
        let input = "#ifdef FOO\nX\n#else\nY\n#endif\n";
        let (out, _) = run_with(input, &["FOO"], &[], |s| s.complement = true);
        assert_eq!(out, "Y\n");
    }

    #[test]
    fn true_if_discards_later_branches() {
        let input = "#if FOO\nA\n#elif BAR\nB\n#else\nC\n#endif\n";
        assert_eq!(run(input, &["FOO=1"], &[]), "A\n");
    }

    #[test]
    fn false_if_unresolved_elif_is_promoted() {
        // The `elif` keyword is overwritten in place, so its extra bytes
        // survive as padding.
        let input = "#if FOO\nA\n#elif BAR\nB\n#else\nC\n#endif\n";
        assert_eq!(run(input, &["FOO=0"], &[]), "#if   BAR\nB\n#else\nC\n#endif\n");
    }

    #[test]
    fn unresolved_elif_true_becomes_else() {
        let input = "#if BAR\nA\n#elif FOO\nB\n#endif\n";
        assert_eq!(run(input, &["FOO=1"], &[]), "#if BAR\nA\n#else\nB\n#endif\n");
    }

    #[test]
    fn unresolved_elif_false_is_dropped() {
        let input = "#if BAR\nA\n#elif FOO\nB\n#endif\n";
        assert_eq!(run(input, &["FOO=0"], &[]), "#if BAR\nA\n#endif\n");
    }

    #[test]
    fn short_circuit_removes_whole_block() {
        let input = "#if defined(DEBUG) && SIZE > 4\nX\n#endif\n";
        assert_eq!(run(input, &[], &["DEBUG"]), "");
    }

    #[test]
    fn partial_simplification_cuts_resolved_operand() {
        let input = "#if UNKNOWN && defined(FOO)\nX\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "#if UNKNOWN \nX\n#endif\n");
    }

    #[test]
    fn partial_simplification_cuts_lhs() {
        let input = "#if defined(FOO) && UNKNOWN\nX\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "#if UNKNOWN\nX\n#endif\n");
    }

    #[test]
    fn false_or_operand_is_cut() {
        let input = "#if defined(DEBUG) || UNKNOWN\nX\n#endif\n";
        assert_eq!(run(input, &[], &["DEBUG"]), "#if UNKNOWN\nX\n#endif\n");
    }

    #[test]
    fn superfluous_parens_are_pruned_with_cut() {
        let input = "#if (UNKNOWN) && defined(FOO)\nX\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "#if UNKNOWN \nX\n#endif\n");
    }

    #[test]
    fn parens_restored_when_nothing_is_cut() {
        let input = "#if (UNKNOWN)\nX\n#endif\n";
        assert_eq!(run(input, &[], &[]), input);
    }

    #[test]
    fn untouched_input_is_byte_identical() {
        let input = "int x; /* a\n   comment */\n#ifdef FOO\ny\n#endif\n\"#ifdef Z\"\n";
        let (out, status) = run_with(input, &[], &[], |_| {});
        assert_eq!(out, input);
        assert_eq!(status, StatusFlags::empty());
    }

    #[test]
    fn crlf_lines_are_preserved() {
        let input = "#ifdef FOO\r\nX\r\n#endif\r\nplain\r\n";
        assert_eq!(run(input, &["FOO"], &[]), "X\r\nplain\r\n");
    }

    #[test]
    fn contradictory_undef_is_commented() {
        let input = "#undef FOO\nY\n";
        let (out, status) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(
            out,
            "//error : inserted by ifprune: \"#undef FOO\" contradicts -D at test.c(1)\nY\n"
        );
        assert!(status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn contradictory_undef_becomes_error_directive() {
        let input = "#undef FOO\nY\n";
        let (out, status) = run_with(input, &["FOO"], &[], |s| {
            s.conflict_policy = ConflictPolicy::Error;
        });
        assert_eq!(
            out,
            "#error : inserted by ifprune: \"#undef FOO\" contradicts -D at test.c(1)\nY\n"
        );
        assert!(status.contains(StatusFlags::ERROR_OUTPUT));
    }

    #[test]
    fn contradictory_undef_is_deleted_under_delete_policy() {
        let input = "#undef FOO\nY\n";
        let (out, _) = run_with(input, &["FOO"], &[], |s| {
            s.conflict_policy = ConflictPolicy::Delete;
        });
        assert_eq!(out, "Y\n");
    }

    #[test]
    fn precautionary_undef_define_pair_is_forgotten() {
        let input = "#undef FOO\n#define FOO\nZ\n";
        let (out, status) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(out, "Z\n");
        assert!(!status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn pending_contradiction_is_flushed_at_eof() {
        let input = "#undef FOO\n";
        let (out, _) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(
            out,
            "//error : inserted by ifprune: \"#undef FOO\" contradicts -D at test.c(1)\n"
        );
    }

    #[test]
    fn comments_do_not_flush_a_pending_contradiction() {
        let input = "#undef FOO\n/* note */\n#define FOO\nZ\n";
        let (out, _) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(out, "/* note */\nZ\n");
    }

    #[test]
    fn differing_define_is_reported() {
        let input = "#define FOO 2\n";
        let (out, _) = run_with(input, &["FOO=1"], &[], |_| {});
        assert_eq!(
            out,
            "//error : inserted by ifprune: \"#define FOO 2\" differently redefines -D at test.c(1)\n"
        );
    }

    #[test]
    fn consistent_valued_define_is_dropped() {
        assert_eq!(run("#define FOO 1\nX\n", &["FOO=1"], &[]), "X\n");
    }

    #[test]
    fn define_of_undefined_symbol_contradicts() {
        let input = "#define FOO\n";
        let (out, _) = run_with(input, &[], &["FOO"], |_| {});
        assert_eq!(
            out,
            "//error : inserted by ifprune: \"#define FOO\" contradicts -U at test.c(1)\n"
        );
    }

    #[test]
    fn functionoid_define_of_assumed_symbol_differs() {
        let input = "#define FOO(x) (x)\n";
        let (out, _) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(
            out,
            "//error : inserted by ifprune: \"#define FOO(x) (x)\" differently redefines -D at test.c(1)\n"
        );
    }

    #[test]
    fn unrelated_define_is_kept() {
        let input = "#define M  a \\\n          b\nX\n";
        assert_eq!(run(input, &[], &[]), input);
    }

    #[test]
    fn consistent_undef_is_dropped() {
        assert_eq!(run("#undef FOO\nX\n", &[], &["FOO"]), "X\n");
    }

    #[test]
    fn unknown_undef_is_kept() {
        assert_eq!(run("#undef FOO\n", &[], &[]), "#undef FOO\n");
    }

    #[test]
    fn continuation_inside_condition() {
        let input = "#ifdef \\\nFOO\nX\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "X\n");
    }

    #[test]
    fn comment_spanning_lines_inside_condition() {
        let input = "#if defined(FOO) /* note\nmore */ && BAR\nX\n#endif\n";
        assert_eq!(run(input, &["FOO"], &[]), "#if BAR\nX\n#endif\n");
    }

    #[test]
    fn directives_inside_dropped_branch_are_not_classified() {
        let input = "#ifdef GONE\n#undef FOO\n#error nope\n#endif\nX\n";
        let (out, status) = run_with(input, &["FOO"], &["GONE"], |_| {});
        assert_eq!(out, "X\n");
        assert!(!status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn nested_blocks_inside_dropped_branch() {
        let input = "#ifdef GONE\n#ifdef FOO\nA\n#endif\nB\n#endif\nC\n";
        assert_eq!(run(input, &[], &["GONE"]), "C\n");
    }

    #[test]
    fn pass_through_nesting_is_preserved() {
        let input = "#if A\n#if B\nX\n#endif\n#endif\n";
        assert_eq!(run(input, &[], &[]), input);
    }

    #[test]
    fn eval_consts_resolves_literal_conditions() {
        let (out, _) = run_with("#if 0\nX\n#endif\nY\n", &[], &[], |s| {
            s.eval_consts = true;
            s.del_consts = true;
        });
        assert_eq!(out, "Y\n");
    }

    #[test]
    fn kept_consts_leave_condition_alone() {
        let input = "#if 1 || UNKNOWN\nX\n#endif\n";
        assert_eq!(run(input, &[], &[]), input);
    }

    #[test]
    fn arithmetic_on_symbol_values() {
        let input = "#if SIZE > 4\nbig\n#else\nsmall\n#endif\n";
        assert_eq!(run(input, &["SIZE=8"], &[]), "big\n");
        assert_eq!(run(input, &["SIZE=2"], &[]), "small\n");
    }

    #[test]
    fn hex_and_octal_literals() {
        let input = "#if MASK == 0x10\nX\n#endif\n";
        assert_eq!(run(input, &["MASK=020"], &[]), "X\n");
    }

    #[test]
    fn divide_by_zero_leaves_condition_unresolved() {
        let input = "#if FOO / ZERO\nX\n#endif\n";
        let (out, status) = run_with(input, &["FOO=1", "ZERO=0"], &[], |_| {});
        assert_eq!(out, input);
        assert!(status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn overflowing_literal_is_unresolved() {
        let input = "#if 99999999999\nX\n#endif\n";
        let (out, status) = run_with(input, &[], &[], |_| {});
        assert_eq!(out, input);
        assert!(status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn empty_symbol_in_expression_warns() {
        let input = "#if FOO\nX\n#endif\n";
        let (out, status) = run_with(input, &["FOO"], &[], |_| {});
        assert_eq!(out, input);
        assert!(status.contains(StatusFlags::WARNING));
    }

    #[test]
    fn circular_definitions_are_insoluble() {
        let input = "#if A\nX\n#endif\n";
        let (out, _) = run_with(input, &["A=B", "B=A"], &[], |_| {});
        assert_eq!(out, input);
    }

    #[test]
    fn symbol_defined_as_expression() {
        let input = "#if A\nX\n#else\nY\n#endif\n";
        assert_eq!(run(input, &["A=2 > 1"], &[]), "X\n");
    }

    #[test]
    fn defined_of_valued_symbol_is_true() {
        let input = "#if defined FOO\nX\n#endif\n";
        assert_eq!(run(input, &["FOO=0"], &[]), "X\n");
    }

    #[test]
    fn unbalanced_open_paren_is_fatal() {
        let err = run_err("#if (A && B\nX\n#endif\n", &[], &[]);
        assert!(err.to_string().contains("Missing \")\""));
    }

    #[test]
    fn unbalanced_close_paren_is_fatal() {
        let err = run_err("#if A)\nX\n#endif\n", &[], &[]);
        assert!(err.to_string().contains("Missing \"(\""));
    }

    #[test]
    fn orphan_directives_are_fatal() {
        assert!(run_err("#endif\n", &[], &[]).to_string().contains("Orphan #endif"));
        assert!(run_err("#else\n", &[], &[]).to_string().contains("Orphan #else"));
        assert!(run_err("#elif A\n", &[], &[]).to_string().contains("Orphan #elif"));
    }

    #[test]
    fn eof_inside_block_is_fatal() {
        let err = run_err("#ifdef FOO\nX\n", &[], &[]);
        assert!(err.to_string().contains("Unexpected EOF"));
    }

    #[test]
    fn eof_inside_multiline_comment_is_fatal() {
        // A newline inside a C comment forces a line extension, so EOF
        // there surfaces as an unexpected end of input.
        let err = run_err("/* open\n", &[], &[]);
        assert!(err.to_string().contains("Unexpected EOF"));
    }

    #[test]
    fn eof_inside_comment_transient_is_fatal() {
        let err = run_err("x /\\\n", &[], &[]);
        assert!(err.to_string().contains("EOF in comment"));
    }

    #[test]
    fn missing_final_newline_is_fatal() {
        let err = run_err("#ifdef FOO\nX\n#endif", &[], &[]);
        assert!(err.to_string().contains("Missing newline at EOF"));
    }

    #[test]
    fn newline_inside_quote_is_fatal() {
        let err = run_err("char *s = \"abc\nX\n", &[], &[]);
        assert!(err.to_string().contains("Newline within quotation"));
    }

    #[test]
    fn nesting_deeper_than_limit_is_fatal() {
        let mut input = String::new();
        for _ in 0..65 {
            input.push_str("#if A\n");
        }
        for _ in 0..65 {
            input.push_str("#endif\n");
        }
        let err = run_err(&input, &[], &[]);
        assert!(err.to_string().contains("Too many levels of nesting"));
    }

    #[test]
    fn discard_blank_keeps_line_count() {
        let (out, _) = run_with("#ifdef FOO\nX\nY\n#endif\nZ\n", &[], &["FOO"], |s| {
            s.discard_policy = DiscardPolicy::Blank;
        });
        assert_eq!(out, "\n\n\n\nZ\n");
    }

    #[test]
    fn discard_comment_prefixes_dropped_lines() {
        let (out, _) = run_with("#ifdef FOO\nX\n#endif\nZ\n", &[], &["FOO"], |s| {
            s.discard_policy = DiscardPolicy::Comment;
        });
        assert_eq!(
            out,
            "//ifprune < #ifdef FOO\n//ifprune < X\n//ifprune < #endif\nZ\n"
        );
    }

    #[test]
    fn line_directives_reanchor_after_drops() {
        let (out, _) = run_with("#ifdef FOO\nX\n#endif\nZ\n", &[], &["FOO"], |s| {
            s.line_directives = true;
        });
        assert_eq!(out, "#line 4\nZ\n");
    }

    #[test]
    fn plaintext_mode_ignores_comments() {
        let input = "// #ifdef FOO in a comment\n#ifdef FOO\nX\n#endif\n";
        let (out, _) = run_with(input, &["FOO"], &[], |s| s.plaintext = true);
        // The leading line is no comment in plaintext mode, so the state
        // machine sees plain text followed by a real conditional.
        assert_eq!(out, "// #ifdef FOO in a comment\nX\n");
    }

    #[test]
    fn symbols_listing_reports_condition_symbols() {
        let input = "#if defined(FOO) && BAR\nX\n#elif FOO\nY\n#endif\n";
        let (out, _) = run_with(input, &[], &[], |s| {
            s.symbols = Some(SymbolsPolicy::All);
        });
        assert_eq!(out, "FOO\nBAR\nFOO\n");
    }

    #[test]
    fn symbols_listing_first_only() {
        let input = "#if defined(FOO) && BAR\nX\n#elif FOO\nY\n#endif\n";
        let (out, _) = run_with(input, &[], &[], |s| {
            s.symbols = Some(SymbolsPolicy::FirstLocate);
        });
        assert_eq!(out, "FOO: test.c(1)\nBAR: test.c(1)\n");
    }

    #[test]
    fn rerunning_output_is_stable() {
        let input = "#if UNKNOWN && defined(FOO)\nX\n#endif\nplain\n";
        let once = run(input, &["FOO"], &[]);
        let twice = run(&once, &["FOO"], &[]);
        assert_eq!(once, twice);
    }

    #[test]
    fn status_counts_drops_and_changes() {
        let (_, status) = run_with("#ifdef FOO\nX\n#endif\n", &["FOO"], &[], |_| {});
        assert_eq!(status, StatusFlags::INFO | StatusFlags::DROPPED_LINES);
        let (_, status) = run_with("#if UNKNOWN && defined(FOO)\nX\n#endif\n", &["FOO"], &[], |_| {});
        assert!(status.contains(StatusFlags::CHANGED_LINES));
    }
}
