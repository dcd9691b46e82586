//! Instruction templates sent to the completion models
//!
//! Every builder is a pure function of its inputs. Topic, outcome and frame
//! text are embedded verbatim; length limits are the model's concern.

/// Format rules shared by every template.
const STYLE_RULES: &str = "\
Rules:
- Write plain text only. Do not use markdown, bullets, asterisks or numbering.
- Do not introduce yourself and do not add a preamble.
- Do not add a closing summary or conclusion.
- Write each section header exactly as shown, followed by a colon.";

const DECISION_EXAMPLE: &str = "\
Example:
Pros: lower rent; closer to family
Cons: longer commute; fewer job openings
Risks: housing market may shift within a year
Recommendation: worth it if remote work stays possible";

/// Decision analysis of one candidate outcome.
pub fn build_prompt(topic: &str, outcome: &str) -> String {
    format!(
        "You are helping someone evaluate one option of a decision.\n\
         Analyze only the option given below and answer with exactly these four sections, \
         one per line: Pros, Cons, Risks, Recommendation.\n\
         {STYLE_RULES}\n\n\
         {DECISION_EXAMPLE}\n\n\
         Decision: {topic}\n\
         Option: {outcome}"
    )
}

/// Storyboard continuation: write the frame that follows `current_frame`.
pub fn build_prompt_next_frame(topic: &str, current_frame: &str) -> String {
    format!(
        "You are a storyboard writer.\n\
         Given the story topic and the current frame, write the single next frame that \
         continues the story. Answer with exactly these two sections, one per line: \
         Next frame, Why it follows.\n\
         {STYLE_RULES}\n\n\
         Example:\n\
         Next frame: the courier reaches the bridge as the storm breaks\n\
         Why it follows: the previous frame set up the race against the weather\n\n\
         Story topic: {topic}\n\
         Current frame: {current_frame}"
    )
}

/// Storyboard review: pick the strongest of the numbered frames.
pub fn build_prompt_analyze_frames<S: AsRef<str>>(topic: &str, frames: &[S]) -> String {
    let numbered = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| format!("Frame {}: {}", i + 1, frame.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a storyboard editor.\n\
         Read the numbered frames below, select the best one for the story topic and justify \
         the choice. Answer with exactly these two sections, one per line: \
         Best frame, Justification.\n\
         {STYLE_RULES}\n\n\
         Example:\n\
         Best frame: 2\n\
         Justification: it introduces the conflict while keeping the setting clear\n\n\
         Story topic: {topic}\n\
         {numbered}"
    )
}
