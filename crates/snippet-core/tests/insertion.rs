use pretty_assertions::assert_eq;
use snippet_core::{
    IndentSettings, Position, Selection, SessionExit, SnippetConfig, SnippetController,
    SnippetEditor, SnippetError, SnippetHost, TemplateErrorKind, TextBuffer,
};

#[test]
fn test_plain_template_round_trips_and_completes() {
    let mut editor = SnippetEditor::new(TextBuffer::new("  x"));
    editor
        .run("if ok {\n\tgo();\n}", Position::new(0, 2), 0, 0, false)
        .unwrap();

    assert_eq!(editor.host().text(), "  if ok {\n  \tgo();\n  }x");
    assert!(!editor.is_in_snippet_mode());
    assert_eq!(editor.last_exit(), Some(SessionExit::Completed));
    // The implicit final placeholder sits at the end of the inserted text.
    assert_eq!(editor.host().selections(), vec![Selection::caret(22)]);
    assert_eq!(editor.host().subscriber_count(), 0);
}

#[test]
fn test_explicit_final_only_places_caret() {
    let mut editor = SnippetEditor::new(TextBuffer::new(""));
    editor.run("(${{}})", Position::new(0, 0), 0, 0, false).unwrap();

    assert_eq!(editor.host().text(), "($)");
    assert_eq!(editor.host().selections(), vec![Selection::caret(2)]);
    assert!(!editor.is_in_snippet_mode());
}

#[test]
fn test_overwrite_before_and_after() {
    let mut editor = SnippetEditor::new(TextBuffer::new("let v = vec.pus;"));
    editor
        .run("push({{item}})", Position::new(0, 15), 3, 1, false)
        .unwrap();

    assert_eq!(editor.host().text(), "let v = vec.push(item)");
    assert_eq!(editor.host().selections(), vec![Selection::new(17, 21)]);
    assert!(editor.is_in_snippet_mode());
}

#[test]
fn test_spaces_setting_expands_template_tabs() {
    let host = TextBuffer::new("\t").with_indent_settings(IndentSettings::spaces(2));
    let mut editor = SnippetEditor::new(host);
    editor
        .run("{\n\t{{body}}\n}", Position::new(0, 1), 0, 0, false)
        .unwrap();

    // Existing line indentation is kept verbatim; template tabs become spaces.
    assert_eq!(editor.host().text(), "\t{\n\t  body\n\t}");
}

#[test]
fn test_overwrite_across_line_break_indents_like_first_line() {
    let mut editor = SnippetEditor::new(TextBuffer::new("    a\nb"));
    editor
        .run("{{x}}\nz", Position::new(1, 0), 1, 0, false)
        .unwrap();

    assert_eq!(editor.host().text(), "    ax\n    zb");
}

#[test]
fn test_zero_tab_width_still_indents() {
    let host = TextBuffer::new("").with_indent_settings(IndentSettings::spaces(0));
    let mut editor = SnippetEditor::new(host);
    editor
        .run("{\n\t{{b}}\n}", Position::new(0, 0), 0, 0, false)
        .unwrap();

    assert_eq!(editor.host().text(), "{\n b\n}");
}

#[test]
fn test_config_overrides_host_indentation() {
    let config = SnippetConfig {
        indent: Some(IndentSettings::spaces(4)),
    };
    let mut editor = SnippetEditor::with_config(TextBuffer::new(""), config);
    editor.run("a\n\t{{b}}", Position::new(0, 0), 0, 0, false).unwrap();

    assert_eq!(editor.host().text(), "a\n    b");
}

#[test]
fn test_malformed_template_leaves_document_untouched() {
    let mut editor = SnippetEditor::new(TextBuffer::new("keep"));
    editor.edit(|host| host.set_cursor(2));

    for (template, kind) in [
        ("{{open", TemplateErrorKind::UnclosedPlaceholder),
        ("{{a{{b}}}}", TemplateErrorKind::NestedPlaceholder),
        ("stray}}", TemplateErrorKind::UnmatchedClose),
        ("{{}}{{}}", TemplateErrorKind::DuplicateFinalPlaceholder),
    ] {
        let version = editor.host().version();
        let err = editor
            .run(template, Position::new(0, 2), 0, 0, false)
            .unwrap_err();
        assert!(matches!(err, SnippetError::MalformedTemplate(e) if e.kind == kind));
        assert_eq!(editor.host().text(), "keep");
        assert_eq!(editor.host().version(), version);
        assert_eq!(editor.host().selections(), vec![Selection::caret(2)]);
    }
    assert!(!editor.is_in_snippet_mode());
}

#[test]
fn test_invalid_position_leaves_document_untouched() {
    let mut editor = SnippetEditor::new(TextBuffer::new("ab\ncd"));

    let err = editor
        .run("{{x}}", Position::new(0, 3), 0, 0, false)
        .unwrap_err();
    assert_eq!(err, SnippetError::InvalidPosition { line: 0, column: 3 });

    let err = editor
        .run("{{x}}", Position::new(9, 0), 0, 0, false)
        .unwrap_err();
    assert_eq!(err, SnippetError::InvalidPosition { line: 9, column: 0 });

    assert_eq!(editor.host().text(), "ab\ncd");
    assert!(!editor.is_in_snippet_mode());
}

#[test]
fn test_failed_run_keeps_running_session() {
    let mut editor = SnippetEditor::new(TextBuffer::new(""));
    editor.run("{{a}}", Position::new(0, 0), 0, 0, false).unwrap();

    assert!(editor.run("{{", Position::new(0, 0), 0, 0, false).is_err());
    assert!(editor.is_in_snippet_mode());
    assert_eq!(editor.host().subscriber_count(), 4);
}

#[test]
fn test_new_run_replaces_session_without_leaking_subscriptions() {
    let mut host = TextBuffer::new("");
    let mut controller = SnippetController::new();

    for _ in 0..3 {
        let cursor = host.char_count();
        controller
            .run(&mut host, "{{a}};", Position::new(0, cursor), 0, 0, false)
            .unwrap();
        assert_eq!(host.subscriber_count(), 4);
    }
    assert_eq!(host.text(), "a;a;a;");
    assert_eq!(controller.last_exit(), Some(SessionExit::Replaced));

    controller.dispose(&mut host);
    assert_eq!(host.subscriber_count(), 0);
}

#[test]
fn test_unicode_offsets_are_characters() {
    let mut editor = SnippetEditor::new(TextBuffer::new("héé"));
    editor
        .run("«{{ñ}}»={{ñ}}", Position::new(0, 3), 0, 0, false)
        .unwrap();
    assert_eq!(editor.host().text(), "héé«ñ»=ñ");
    assert_eq!(editor.host().selections(), vec![Selection::new(4, 5)]);

    editor.edit(|host| host.insert_text("日本")).unwrap();
    assert_eq!(editor.host().text(), "héé«日本»=日本");
}
