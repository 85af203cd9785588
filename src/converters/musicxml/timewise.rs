//! Partwise → timewise reshaping
//!
//! MusicXML stores scores either part-by-part (`score-partwise`) or
//! measure-by-measure (`score-timewise`). The reader walks measures, so a
//! partwise document is rewritten first. This is a pure tree rewrite.

use crate::converters::errors::ImportError;
use crate::converters::musicxml::xml::XmlElement;

/// Return a `score-timewise` tree for either input layout.
///
/// Output has one `<measure>` per measure of the first part, each holding a
/// `<part>` per part, in original part order. Measures a later part has
/// beyond the first part's count are dropped.
pub fn to_timewise(root: XmlElement) -> Result<XmlElement, ImportError> {
    match root.name.as_str() {
        "score-timewise" => Ok(root),
        "score-partwise" => convert_partwise(root),
        _ => Err(ImportError::Syntax(
            "Didn't find 'score-partwise' or 'score-timewise'.".to_string(),
        )),
    }
}

fn convert_partwise(root: XmlElement) -> Result<XmlElement, ImportError> {
    let XmlElement {
        attributes,
        text,
        children,
        ..
    } = root;

    let (parts, header): (Vec<XmlElement>, Vec<XmlElement>) =
        children.into_iter().partition(|c| c.name == "part");

    let first_part = parts.first().ok_or_else(|| {
        ImportError::data("Couldn't convert partwise to timewise. No part found.")
    })?;

    let mut measures: Vec<XmlElement> = first_part
        .children_named("measure")
        .map(|old| XmlElement {
            name: "measure".to_string(),
            attributes: old.attributes.clone(),
            text: None,
            children: Vec::new(),
        })
        .collect();

    for part in parts {
        let XmlElement {
            attributes: part_attributes,
            children: part_children,
            ..
        } = part;

        let part_measures = part_children.into_iter().filter(|c| c.name == "measure");
        for (idx, measure) in part_measures.enumerate() {
            let Some(new_measure) = measures.get_mut(idx) else {
                log::debug!("Dropping measure {} missing from the first part", idx + 1);
                continue;
            };

            let mut measure_part = XmlElement::new("part");
            let number = new_measure
                .attribute("number")
                .map(str::to_string)
                .unwrap_or_else(|| (idx + 1).to_string());
            measure_part.set_attribute("number", number);
            for (name, value) in &part_attributes {
                measure_part.set_attribute(name, value.clone());
            }
            measure_part.children = measure.children;

            new_measure.children.push(measure_part);
        }
    }

    let mut children = header;
    children.append(&mut measures);

    Ok(XmlElement {
        name: "score-timewise".to_string(),
        attributes,
        text,
        children,
    })
}
