use crate::model::Category;
use crate::seed::DEFAULT_GROUP;

/// Categories sharing one display group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub name: String,
    pub categories: Vec<&'a Category>,
}

/// Group categories for display.
///
/// Groups listed in `order` come first (even when empty), followed by any
/// other group in name order. Categories without a group land in
/// [`DEFAULT_GROUP`]; within a group categories are sorted by name.
pub fn group_categories<'a>(categories: &'a [Category], order: &[String]) -> Vec<CategoryGroup<'a>> {
    let mut groups: Vec<CategoryGroup<'a>> = order
        .iter()
        .map(|name| CategoryGroup {
            name: name.clone(),
            categories: Vec::new(),
        })
        .collect();

    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by(|a, b| {
        a.display_group
            .as_deref()
            .unwrap_or(DEFAULT_GROUP)
            .cmp(b.display_group.as_deref().unwrap_or(DEFAULT_GROUP))
            .then_with(|| a.name.cmp(&b.name))
    });

    for category in sorted {
        let group_name = category.display_group.as_deref().unwrap_or(DEFAULT_GROUP);
        match groups.iter_mut().find(|group| group.name == group_name) {
            Some(group) => group.categories.push(category),
            None => groups.push(CategoryGroup {
                name: group_name.to_string(),
                categories: vec![category],
            }),
        }
    }

    groups
}
