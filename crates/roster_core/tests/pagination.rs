use roster_core::db::open_db_in_memory;
use roster_core::{NewStudent, Paginator, SqliteStudentRepository, StudentRepository};

fn fill(repo: &mut SqliteStudentRepository<'_>, count: usize) {
    for letter in ('a'..='z').cycle().take(count) {
        let fio = format!("Student Number {letter}");
        repo.add(&NewStudent::new(fio, "123456").with_exam("Math", 5))
            .unwrap();
    }
}

#[test]
fn pages_concatenate_to_the_full_ordered_set() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteStudentRepository::try_new(&mut conn).unwrap();
    fill(&mut repo, 23);
    let everything = repo.get_all().unwrap();

    for &page_size in roster_core::PAGE_SIZE_PRESETS {
        let mut paginator = Paginator::new(page_size).unwrap();
        paginator.refresh(&repo).unwrap();
        assert_eq!(
            u64::from(paginator.total_pages()),
            23_u64.div_ceil(u64::from(page_size))
        );

        let mut collected = Vec::new();
        loop {
            let slice = paginator.page_slice(&repo).unwrap();
            assert!(slice.len() <= page_size as usize);
            collected.extend(slice);
            if paginator.current_page() == paginator.total_pages() {
                break;
            }
            paginator.next();
        }
        assert_eq!(collected, everything, "page_size={page_size}");
    }
}

#[test]
fn empty_store_shows_page_one_of_one() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&mut conn).unwrap();

    let mut paginator = Paginator::default();
    paginator.refresh(&repo).unwrap();
    assert_eq!(paginator.current_page(), 1);
    assert_eq!(paginator.total_pages(), 1);
    assert!(paginator.page_slice(&repo).unwrap().is_empty());
}

#[test]
fn refresh_after_delete_keeps_cursor_in_range() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteStudentRepository::try_new(&mut conn).unwrap();
    fill(&mut repo, 6);

    let mut paginator = Paginator::new(5).unwrap();
    paginator.refresh(&repo).unwrap();
    paginator.last();
    assert_eq!(paginator.current_page(), 2);
    let last_page = paginator.page_slice(&repo).unwrap();
    assert_eq!(last_page.len(), 1);

    assert!(repo.delete(last_page[0].id).unwrap());
    paginator.refresh(&repo).unwrap();
    assert_eq!(paginator.total_count(), 5);
    assert_eq!(paginator.current_page(), 1);
    assert_eq!(paginator.page_slice(&repo).unwrap().len(), 5);
}
