//! Prompt builders for each generation step
//!
//! All prompts are Japanese; the model is instructed to answer in Japanese
//! and to emit only the markup the sanitizer keeps.

use crate::models::{GenerationInput, OutlineSection, Tone};

/// Shared system prompt
pub fn system_prompt() -> &'static str {
    "あなたは日本語で執筆する専門ライターであり、SEOにも精通した編集者です。\n\
    \n\
    ### 守るべきルール\n\
    1. 回答は必ず日本語で書く\n\
    2. 正確で裏付けのある情報だけを使う\n\
    3. 見出し構造が明確で読みやすい文章にする\n\
    4. 使用できるHTMLタグは h2, h3, p, ul, ol, li, blockquote, code, pre, strong, em, a のみ\n\
    5. 推測や誤解を招く表現を避ける\n\
    6. 著作権を侵害しない\n\
    7. 政治的・宗教的に偏った記述をしない\n\
    \n\
    ### 品質基準\n\
    - 簡潔で明確な表現\n\
    - 論理的な構成\n\
    - 読者の知識レベルに合わせた説明\n\
    - 具体例や根拠の提示"
}

fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Tech => "技術者向けに、正確な用語で具体的に説明する",
        Tone::Business => "ビジネスパーソン向けに、成果や判断材料を重視して説明する",
        Tone::Casual => "親しみやすい話し言葉寄りの文体で説明する",
        Tone::Formal => "丁寧で格式のある文体で説明する",
        Tone::Academic => "学術的な文体で、定義と根拠を明確にして説明する",
    }
}

fn context_block(input: &GenerationInput) -> String {
    let mut block = format!(
        "要約: {}\n目的: {}\n想定読者: {}\nトーン: {}（{}）",
        input.summary,
        input.goal,
        input.audience,
        input.tone,
        tone_instruction(input.tone)
    );

    if !input.must_topics.is_empty() {
        block.push_str(&format!("\n必須トピック: {}", input.must_topics.join("、")));
    }
    if !input.bans.is_empty() {
        block.push_str(&format!("\n禁止事項: {}", input.bans.join("、")));
    }
    block
}

/// Outline request (JSON mode)
pub fn outline_prompt(input: &GenerationInput) -> String {
    let mut prompt = format!(
        "次の情報をもとに、記事の見出し構成を作成してください。\n\n\
        ### 記事情報\n\
        {}\n\
        目標文字数: {}字",
        context_block(input),
        input.target_chars
    );

    if !input.references.is_empty() {
        prompt.push_str(&format!("\n参考URL: {}", input.references.join(", ")));
    }

    prompt.push_str(
        "\n\n### 要件\n\
        - H2見出しを6〜9個作る\n\
        - 各H2の下にH3見出しを2〜3個作る\n\
        - 読者が順を追って理解できる順序に並べる\n\
        - 検索されやすいキーワードを自然に含める\n\
        \n\
        ### 出力形式\n\
        次のJSONだけを出力してください。\n\
        {\"title\": \"記事タイトル\", \"sections\": [{\"h2\": \"H2見出し\", \"h3\": [\"H3見出し\", \"H3見出し\"]}]}",
    );
    prompt
}

/// Body HTML for one outline section
pub fn section_prompt(input: &GenerationInput, section: &OutlineSection, target_chars: usize) -> String {
    format!(
        "次の見出し構成に沿って、本文を作成してください。\n\n\
        ### セクション\n\
        H2見出し: {}\n\
        H3見出し: {}\n\n\
        ### 記事の前提\n\
        {}\n\n\
        ### 要件\n\
        - 文字数はおよそ{}字（空白を除く）\n\
        - H2見出しから書き始め、各H3見出しの下に具体的な内容を書く\n\
        - 具体例や根拠を含める\n\
        - リンクは信頼できるURLのみ\n\n\
        ### 出力\n\
        HTMLのみを出力してください。前置きや説明は不要です。",
        section.heading,
        section.subheadings.join(" / "),
        context_block(input),
        target_chars
    )
}

/// Additional detail for an existing section
pub fn expansion_prompt(input: &GenerationInput, heading: &str, target_chars: usize) -> String {
    format!(
        "次のセクションに追記する内容を作成してください。\n\n\
        セクション: {}\n\
        記事の要約: {}\n\
        追加する文字数: およそ{}字\n\n\
        ### 追記する内容\n\
        - より具体的な事例\n\
        - 踏み込んだ解説\n\
        - 実践的なアドバイス\n\
        - 関連する補足情報\n\n\
        H2見出しは含めず、h3, p, ul, ol, li, strong, em タグを使ったHTMLのみを出力してください。",
        heading, input.summary, target_chars
    )
}

/// Metadata request (JSON mode) built from the finished body
pub fn finalization_prompt(input: &GenerationInput, title_hint: &str, preview: &str) -> String {
    format!(
        "次の記事本文をもとに、公開用のメタデータを作成してください。\n\n\
        ### 元の依頼\n\
        要約: {}\n\
        目的: {}\n\
        想定読者: {}\n\
        仮タイトル: {}\n\n\
        ### 本文（冒頭）\n\
        {}...\n\n\
        ### 要件\n\
        - title: 10〜100字の検索に強いタイトル\n\
        - slug: 英小文字・数字・ハイフンのみ、3〜50字\n\
        - excerpt: 50〜300字の抜粋\n\
        - meta_description: 50〜160字\n\
        - tags: 最大10個（各2〜30字）\n\
        - categories: 最大5個（各2〜50字）\n\
        - faq: 質問と回答のペアを最大5個（answer_htmlはHTML）\n\
        - cta_html: 読者に次の行動を促すHTML\n\
        - schema_org: Article型の構造化データ\n\
        - hero_image_prompt: アイキャッチ画像の生成指示（任意、500字以内）\n\n\
        ### 出力形式\n\
        次のキーを持つJSONだけを出力してください。\n\
        {{\"title\": \"\", \"slug\": \"\", \"excerpt\": \"\", \"meta_description\": \"\", \
        \"tags\": [], \"categories\": [], \"faq\": [{{\"question\": \"\", \"answer_html\": \"\"}}], \
        \"cta_html\": \"\", \"schema_org\": {{\"@context\": \"https://schema.org\", \"@type\": \"Article\"}}, \
        \"hero_image_prompt\": \"\"}}",
        input.summary, input.goal, input.audience, title_hint, preview
    )
}
