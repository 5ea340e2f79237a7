use std::collections::HashMap;
use std::fmt::Display;

use thiserror::Error;

use crate::scene::{BodyKind, Group, Scene};

/// 장면을 넣기 전의 레이 트레이싱 컴퓨트 쉐이더 (GLSL)
pub const RAYTRACE_TEMPLATE: &str = include_str!("../../shaders/raytrace_template.glsl");

/// 누적 버퍼를 화면에 그리는 쉐이더 (WGSL)
pub const PRESENT_SHADER: &str = include_str!("../../shaders/present.wgsl");

// GLSL은 길이 0인 배열을 허용하지 않으므로 빈 그룹에 넣는 자리 채움용 값
const EMPTY_BOX: &str = "{{0.0, 0.0, 0.0},{0.0, 0.0, 0.0}}";
const EMPTY_BALL: &str = "{{0.0, 0.0, 0.0}, 0.0}";
const EMPTY_COLOR: &str = "{0.0, 0.0, 0.0}";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template placeholder ${{{name}}}")]
    UnknownPlaceholder { name: String },

    #[error("unterminated template placeholder at byte {offset}")]
    Unterminated { offset: usize },
}

/// `${NAME}` 자리에 장면 배열들을 GLSL 리터럴로 채워 넣음.
///
/// 템플릿은 왼쪽부터 한 번만 훑음. 채워 넣은 문자열은 다시 보지 않으니
/// 리터럴 안의 중괄호가 치환에 영향을 주지 않음.
pub fn expand(template: &str, scene: &Scene) -> Result<String, TemplateError> {
    let values = placeholders(scene);
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(TemplateError::Unterminated {
            offset: offset + start,
        })?;

        let name = after[..end].trim();
        let value = values
            .get(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder {
                name: name.to_owned(),
            })?;
        output.push_str(value);

        let consumed = start + 2 + end + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    output.push_str(rest);

    Ok(output)
}

fn placeholders(scene: &Scene) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for kind in BodyKind::ALL {
        let group = scene.group(kind);
        let prefix = match kind {
            BodyKind::Box => "BOX",
            BodyKind::Ball => "BALL",
        };
        let empty_desc = match kind {
            BodyKind::Box => EMPTY_BOX,
            BodyKind::Ball => EMPTY_BALL,
        };

        let mut insert = |name: &str, value: String| {
            values.insert(format!("{prefix}_{name}"), value);
        };
        insert("COUNT", format!("{}u", group.num()));
        insert("ARRAY_LEN", group.len().max(1).to_string());
        insert("DESCS", initializer(group.descs(), empty_desc));
        insert("COLORS", initializer(group.colors(), EMPTY_COLOR));
        insert("MATERIALS", material_codes(group));
        insert("FUZZS", initializer(&floats(group.fuzzs()), "0.0"));
        insert("ETAS", initializer(&floats(group.etas()), "0.0"));
    }

    values
}

fn floats(values: &[f32]) -> Vec<String> {
    values.iter().map(|value| format!("{value:.6}")).collect()
}

fn material_codes(group: &Group) -> String {
    let codes: Vec<String> = group
        .materials()
        .iter()
        .map(|kind| format!("{}u", kind.code()))
        .collect();
    initializer(&codes, "0u")
}

fn initializer<T: Display>(items: &[T], empty: &str) -> String {
    if items.is_empty() {
        return format!("{{{empty}}}");
    }

    let joined = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!("{{\n    {joined}\n}}")
}
